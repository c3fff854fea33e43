//! Scripted execution engine.
//!
//! Provides an in-memory [`ExecutionEngine`] whose answers are set up ahead
//! of time. Used for unit and integration tests, and by local agent
//! sessions that have no real engine behind them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use relay_protocol::ClassBytecodes;
use serde_json::Value;

use crate::engine::{EngineError, ExecutionEngine};

/// Scripted answer for an `invoke` or `var_value` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Return this text.
    Result(String),
    /// Fail with this classification.
    Fail(EngineError),
    /// Block until [`ExecutionEngine::stop`] is called, then fail with
    /// [`EngineError::Stopped`].
    BlockUntilStopped,
}

/// Thread-safe scripted engine.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    inner: Mutex<Inner>,
    wakeup: Condvar,
}

#[derive(Debug, Default)]
struct Inner {
    /// Installed classes by name.
    classes: BTreeMap<String, Vec<u8>>,
    /// Names passed to successful redefinitions, in order.
    redefined: Vec<String>,
    classpath: Vec<String>,
    invocations: HashMap<(String, String), Script>,
    variables: HashMap<(String, String), Script>,
    extensions: HashMap<String, Result<Value, EngineError>>,
    extension_calls: Vec<(String, Value)>,
    invoke_calls: usize,
    stop_calls: usize,
    /// An invocation is blocked waiting for stop.
    executing: bool,
    stop_requested: bool,
    closed: bool,
    stop_failure: Option<EngineError>,
    close_failure: Option<EngineError>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> Result<MutexGuard<'_, Inner>, EngineError> {
        let inner = self.lock();
        if inner.closed {
            return Err(EngineError::terminated("engine closed"));
        }
        Ok(inner)
    }

    /// Script the answer for `class_name.method_name`.
    pub fn script_invoke(&self, class_name: &str, method_name: &str, script: Script) {
        self.lock()
            .invocations
            .insert((class_name.to_string(), method_name.to_string()), script);
    }

    /// Script the value of `class_name.var_name`.
    pub fn script_var(&self, class_name: &str, var_name: &str, script: Script) {
        self.lock()
            .variables
            .insert((class_name.to_string(), var_name.to_string()), script);
    }

    /// Script the result of an extension command.
    pub fn script_extension(&self, name: &str, result: Result<Value, EngineError>) {
        self.lock().extensions.insert(name.to_string(), result);
    }

    /// Make every later `stop` call fail with `error`.
    pub fn fail_stop(&self, error: EngineError) {
        self.lock().stop_failure = Some(error);
    }

    /// Make every later `close` call fail with `error`.
    pub fn fail_close(&self, error: EngineError) {
        self.lock().close_failure = Some(error);
    }

    /// Names of installed classes, sorted.
    pub fn loaded_classes(&self) -> Vec<String> {
        self.lock().classes.keys().cloned().collect()
    }

    /// Installed bytecode for `name`.
    pub fn bytecodes(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().classes.get(name).cloned()
    }

    pub fn redefined_classes(&self) -> Vec<String> {
        self.lock().redefined.clone()
    }

    pub fn classpath(&self) -> Vec<String> {
        self.lock().classpath.clone()
    }

    pub fn extension_calls(&self) -> Vec<(String, Value)> {
        self.lock().extension_calls.clone()
    }

    pub fn invoke_calls(&self) -> usize {
        self.lock().invoke_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.lock().stop_calls
    }

    /// Whether an invocation is currently blocked waiting for stop.
    pub fn is_executing(&self) -> bool {
        self.lock().executing
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Run a scripted answer, blocking if the script says so.
    fn answer(&self, mut inner: MutexGuard<'_, Inner>, script: Script) -> Result<String, EngineError> {
        match script {
            Script::Result(text) => Ok(text),
            Script::Fail(error) => Err(error),
            Script::BlockUntilStopped => {
                inner.executing = true;
                inner.stop_requested = false;
                while !inner.stop_requested {
                    inner = self.wakeup.wait(inner).unwrap_or_else(PoisonError::into_inner);
                }
                inner.executing = false;
                inner.stop_requested = false;
                Err(EngineError::Stopped)
            }
        }
    }
}

impl ExecutionEngine for ScriptedEngine {
    /// Classes with empty bytecode fail to install; the rest install.
    fn load(&self, classes: &[ClassBytecodes]) -> Result<(), EngineError> {
        let mut inner = self.open()?;
        let installed: Vec<bool> = classes.iter().map(|c| !c.bytecodes.is_empty()).collect();
        for class in classes.iter().filter(|c| !c.bytecodes.is_empty()) {
            inner.classes.insert(class.name.clone(), class.bytecodes.clone());
        }
        install_result(&installed)
    }

    /// Only classes that were loaded before can be redefined.
    fn redefine(&self, classes: &[ClassBytecodes]) -> Result<(), EngineError> {
        let mut inner = self.open()?;
        let mut installed = Vec::with_capacity(classes.len());
        for class in classes {
            let ok = !class.bytecodes.is_empty() && inner.classes.contains_key(&class.name);
            if ok {
                inner.classes.insert(class.name.clone(), class.bytecodes.clone());
                inner.redefined.push(class.name.clone());
            }
            installed.push(ok);
        }
        install_result(&installed)
    }

    fn invoke(&self, class_name: &str, method_name: &str) -> Result<String, EngineError> {
        let mut inner = self.open()?;
        inner.invoke_calls += 1;
        let script = inner
            .invocations
            .get(&(class_name.to_string(), method_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                EngineError::internal(format!("no such method: {}.{}", class_name, method_name))
            })?;
        self.answer(inner, script)
    }

    fn var_value(&self, class_name: &str, var_name: &str) -> Result<String, EngineError> {
        let inner = self.open()?;
        let script = inner
            .variables
            .get(&(class_name.to_string(), var_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                EngineError::internal(format!("no such variable: {}.{}", class_name, var_name))
            })?;
        self.answer(inner, script)
    }

    fn add_to_classpath(&self, path: &str) -> Result<(), EngineError> {
        self.open()?.classpath.push(path.to_string());
        Ok(())
    }

    fn stop(&self) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.stop_calls += 1;
        if let Some(error) = inner.stop_failure.clone() {
            return Err(error);
        }
        if inner.executing {
            inner.stop_requested = true;
            self.wakeup.notify_all();
        }
        Ok(())
    }

    fn close(&self) -> Result<(), EngineError> {
        let mut inner = self.lock();
        if let Some(error) = inner.close_failure.clone() {
            return Err(error);
        }
        inner.closed = true;
        Ok(())
    }

    fn extension_command(&self, name: &str, arg: Value) -> Result<Value, EngineError> {
        let mut inner = self.open()?;
        inner.extension_calls.push((name.to_string(), arg));
        inner.extensions.get(name).cloned().unwrap_or_else(|| {
            Err(EngineError::not_implemented(format!(
                "extension command not supported: {}",
                name
            )))
        })
    }
}

fn install_result(installed: &[bool]) -> Result<(), EngineError> {
    let failed = installed.iter().filter(|ok| !**ok).count();
    if failed == 0 {
        return Ok(());
    }
    Err(EngineError::ClassInstall {
        message: format!("{} of {} classes failed to install", failed, installed.len()),
        installed: installed.to_vec(),
    })
}
