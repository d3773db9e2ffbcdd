// cvar.rs — dynamic variable tracking

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::com_printf;

// cvar flags
pub const CVAR_ARCHIVE: i32 = 1; // saved by the host's config writer
pub const CVAR_NOSET: i32 = 8; // only settable from code
pub const CVAR_LATCH: i32 = 16; // takes effect on the next map load

/// A console variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub latched_string: Option<String>,
    pub flags: i32,
    pub value: f32,
}

/// The full cvar system context.
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) cvar lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self {
            cvar_vars: Vec::new(),
            cvar_index: HashMap::new(),
        }
    }

    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// Get the string value of a cvar. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |var| var.string.as_str())
    }

    /// Get or create a cvar. If it already exists, the value is not changed
    /// but flags are OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            latched_string: None,
            flags,
            value: value.parse::<f32>().unwrap_or(0.0),
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Set a cvar value (respects NOSET and LATCH flags).
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        let idx = match self.find_var_index(name) {
            Some(idx) => idx,
            None => return self.get(name, value, 0),
        };

        let var = &mut self.cvar_vars[idx];
        if var.flags & CVAR_NOSET != 0 {
            com_printf(&format!("{} is write protected.\n", name));
            return idx;
        }

        if var.flags & CVAR_LATCH != 0 {
            let current = var.latched_string.as_deref().unwrap_or(&var.string);
            if value == current {
                return idx;
            }
            com_printf(&format!("{} will be changed for next map.\n", name));
            var.latched_string = Some(value.to_string());
            return idx;
        }

        if value == var.string {
            return idx;
        }

        var.string = value.to_string();
        var.value = value.parse::<f32>().unwrap_or(0.0);
        idx
    }

    /// Apply all latched variable changes. Called before a map load.
    pub fn get_latched_vars(&mut self) {
        for var in &mut self.cvar_vars {
            if let Some(latched) = var.latched_string.take() {
                var.value = latched.parse::<f32>().unwrap_or(0.0);
                var.string = latched;
            }
        }
    }
}

impl Default for CvarContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Global singleton and free-function wrappers
// ============================================================

static CVAR_CTX: Mutex<Option<CvarContext>> = Mutex::new(None);

/// Access the global cvar table, creating it on first use.
pub fn with_cvar_ctx<F, R>(f: F) -> R
where
    F: FnOnce(&mut CvarContext) -> R,
{
    let mut g = CVAR_CTX.lock();
    f(g.get_or_insert_with(CvarContext::new))
}

pub fn cvar_get(name: &str, value: &str, flags: i32) -> usize {
    with_cvar_ctx(|c| c.get(name, value, flags))
}

pub fn cvar_set(name: &str, value: &str) {
    with_cvar_ctx(|c| {
        c.set(name, value);
    });
}

pub fn cvar_get_latched_vars() {
    with_cvar_ctx(|c| c.get_latched_vars());
}

pub fn cvar_variable_value(name: &str) -> f32 {
    CVAR_CTX.lock().as_ref().map_or(0.0, |c| c.variable_value(name))
}

pub fn cvar_variable_string(name: &str) -> String {
    CVAR_CTX
        .lock()
        .as_ref()
        .map_or(String::new(), |c| c.variable_string(name).to_string())
}

// ============================================================
// Tests
// ============================================================
