use std::{fmt::Write, panic};

use crate::host::memory_helper;
use wasm_bindgen::prelude::wasm_bindgen;

#[wasm_bindgen]
extern "C" {
    type Error;

    #[wasm_bindgen(constructor)]
    fn new() -> Error;

    #[wasm_bindgen(structural, method, getter)]
    fn stack(error: &Error) -> String;

    #[wasm_bindgen(static_method_of = Error, setter, js_name = stackTraceLimit)]
    fn stack_trace_limit(size: f32);
}

pub fn setup_panic_hook() {
    panic::set_hook(Box::new(panic_hook));
}

/// Stack frames below the panic machinery, or the whole stack minus its `Error` header when the marker symbol
/// was stripped by wasm-opt.
fn trimmed_stack() -> String {
    Error::stack_trace_limit(10000_f32);

    let stack = Error::new().stack();

    if stack.contains("__rust_end_short_backtrace") {
        stack
            .lines()
            .skip_while(|line| !line.contains("__rust_end_short_backtrace"))
            .skip(1)
            .fold(String::new(), |mut out, line| {
                let _ = writeln!(out, "{}", line);
                out
            })
    } else {
        stack.split_once('\n').map(|(_, s)| s).unwrap_or(&stack).to_string()
    }
}

fn panic_hook(info: &panic::PanicHookInfo) {
    let mut fmt_error = String::new();
    let _ = writeln!(fmt_error, "{}", info);
    let _ = write!(fmt_error, "{}", trimmed_stack());

    log::error!("{}", fmt_error);

    if memory_helper::path_get("_features.notify.errors").as_bool().unwrap_or(true) {
        screeps::game::notify(&format!("Panic: {}", info), None);
    }
}
