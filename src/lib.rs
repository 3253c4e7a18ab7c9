#![recursion_limit = "256"]
#![warn(clippy::all)]

#[cfg(target_arch = "wasm32")]
#[global_allocator]
static ALLOC: talc::TalckWasm = unsafe { talc::TalckWasm::new_global() };

pub mod cache;
pub mod cleanup;
pub mod constants;
pub mod creep;
pub mod creeppair;
pub mod error;
pub mod events;
pub mod features;
pub mod findnearest;
pub mod game_loop;
pub mod heap;
pub mod host;
#[cfg(target_arch = "wasm32")]
mod logging;
pub mod memory;
#[cfg(target_arch = "wasm32")]
mod panic;
pub mod roles;
pub mod serialize;
pub mod spawnsystem;
pub mod tasks;
pub mod world;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::*;
    use crate::game_loop::Environment;
    use crate::host::live::ScreepsHost;
    use crate::host::HostHandle;
    use std::cell::RefCell;
    use std::sync::Arc;
    use wasm_bindgen::prelude::*;

    thread_local! {
        static ENVIRONMENT: RefCell<Option<Environment>> = const { RefCell::new(None) };
        static HOST: HostHandle = HostHandle::new(Arc::new(ScreepsHost::new()));
    }

    #[wasm_bindgen(js_name = setup)]
    pub fn setup() {
        logging::setup_logging(logging::Info);
        panic::setup_panic_hook();
    }

    #[wasm_bindgen(js_name = game_loop)]
    pub fn game_loop_export() {
        HOST.with(|host| {
            ENVIRONMENT.with(|environment| {
                game_loop::run_tick(&mut environment.borrow_mut(), host);
            })
        });
    }
}
