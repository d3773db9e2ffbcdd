// common.rs — console output and error reporting

use parking_lot::Mutex;

use crate::q_shared::{ERR_DROP, ERR_FATAL};

// ============================================================
// Redirect buffer for Com_Printf
// ============================================================

static RD_BUFFER: Mutex<Option<String>> = Mutex::new(None);

/// Begin redirecting printf output into a buffer.
pub fn com_begin_redirect() {
    *RD_BUFFER.lock() = Some(String::new());
}

/// End redirect and return the captured output.
pub fn com_end_redirect() -> Option<String> {
    RD_BUFFER.lock().take()
}

// ============================================================
// Com_Printf / Com_DPrintf / Com_Error
// ============================================================

/// General-purpose print function. Appends to the redirect buffer when one
/// is active, otherwise prints to stdout.
pub fn com_printf(msg: &str) {
    {
        let mut buf = RD_BUFFER.lock();
        if let Some(ref mut s) = *buf {
            s.push_str(msg);
            return;
        }
    }
    print!("{}", msg);
}

/// Register the cvars console output depends on.
pub fn com_init() {
    crate::cvar::cvar_get("developer", "0", 0);
}

/// Developer-only print, controlled by the "developer" cvar.
pub fn com_dprintf(msg: &str) {
    if crate::cvar::cvar_variable_value("developer") == 0.0 {
        return;
    }
    com_printf(msg);
}

/// Engine error handler.
/// - `ERR_FATAL`: prints to stderr and panics. Used for broken map invariants.
/// - `ERR_DROP`: prints the error and returns; the caller skips the item.
pub fn com_error(code: i32, msg: &str) {
    if code == ERR_FATAL {
        eprintln!("Error: {}", msg);
        panic!("Fatal error: {}", msg);
    } else if code == ERR_DROP {
        eprintln!("********************\nERROR: {}\n********************", msg);
    } else {
        eprintln!("{}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_captures_printf() {
        com_begin_redirect();
        com_printf("captured line\n");
        let out = com_end_redirect().unwrap_or_default();
        assert!(out.contains("captured line"), "redirect buffer was {:?}", out);
        // tests run in parallel, so only check our own line made it
        assert!(com_end_redirect().is_none());
    }

    #[test]
    fn test_com_init_registers_developer() {
        com_init();
        assert_eq!(crate::cvar::cvar_variable_string("developer"), "0");
        com_dprintf("hidden unless developer is set\n");
    }

    #[test]
    #[should_panic(expected = "Fatal error: broken")]
    fn test_com_error_fatal_panics() {
        com_error(ERR_FATAL, "broken");
    }

    #[test]
    fn test_com_error_drop_returns() {
        com_error(ERR_DROP, "recoverable");
    }
}
