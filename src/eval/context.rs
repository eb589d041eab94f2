use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::value::Value;

use super::{EvalError, EvalResult};

/// Native function callable from snippets. Takes the context so helpers
/// like `print` and `as_table` can write to the captured output stream.
pub type NativeFn = fn(&mut EvalContext, Vec<Value>) -> EvalResult<Value>;

/// A named bundle of constants and native functions, bound into the
/// namespace under its module name (`math.pi`, `math.sqrt(2)`).
#[derive(Clone)]
pub struct Module {
    name: String,
    consts: HashMap<&'static str, Value>,
    funcs: HashMap<&'static str, NativeFn>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consts: HashMap::new(),
            funcs: HashMap::new(),
        }
    }

    pub fn with_const(mut self, name: &'static str, value: Value) -> Self {
        self.consts.insert(name, value);
        self
    }

    pub fn with_func(mut self, name: &'static str, func: NativeFn) -> Self {
        self.funcs.insert(name, func);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.consts.get(name)
    }

    pub fn function(&self, name: &str) -> Option<NativeFn> {
        self.funcs.get(name).copied()
    }

    pub fn member(&self, name: &str) -> EvalResult<Value> {
        if let Some(value) = self.constant(name) {
            return Ok(value.clone());
        }
        if self.function(name).is_some() {
            return Err(EvalError::InvalidOperation(format!(
                "`{}.{}` is a function and must be called",
                self.name, name
            )));
        }
        Err(EvalError::UnknownAttribute {
            module: self.name.clone(),
            name: name.to_string(),
        })
    }
}

/// The environment one snippet evaluates against: caller variables,
/// auto-loaded modules, builtin functions and the shared output buffer.
///
/// Lookup resolves variables before modules, so a persisted variable
/// legitimately shadows a module name.
pub struct EvalContext {
    vars: HashMap<String, Value>,
    modules: HashMap<String, Module>,
    builtins: HashMap<&'static str, NativeFn>,
    output: Arc<Mutex<String>>,
}

impl EvalContext {
    pub fn new(output: Arc<Mutex<String>>) -> Self {
        let mut ctx = Self {
            vars: HashMap::new(),
            modules: HashMap::new(),
            builtins: HashMap::new(),
            output,
        };
        super::builtins::install_core(&mut ctx);
        ctx
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn vars(&self) -> &HashMap<String, Value> {
        &self.vars
    }

    pub fn into_vars(self) -> HashMap<String, Value> {
        self.vars
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn register_builtin(&mut self, name: &'static str, func: NativeFn) {
        self.builtins.insert(name, func);
    }

    pub fn builtin(&self, name: &str) -> Option<NativeFn> {
        self.builtins.get(name).copied()
    }

    /// Append to the captured output stream. The buffer is shared with the
    /// coordinator so partial output survives a timed-out worker.
    pub fn write_output(&self, text: &str) {
        let mut guard = match self.output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push_str(text);
    }
}
