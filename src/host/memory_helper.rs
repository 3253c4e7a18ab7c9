use wasm_bindgen::JsValue;

/// The `Memory` root object from the Screeps global.
pub fn root() -> JsValue {
    js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("Memory")).unwrap_or(JsValue::UNDEFINED)
}

/// Navigate a dotted path (e.g. "_features.reset.environment") in the Memory object.
pub fn path_get(path: &str) -> JsValue {
    let mut current = root();

    for key in path.split('.') {
        if current.is_undefined() || current.is_null() {
            return JsValue::UNDEFINED;
        }

        current = js_sys::Reflect::get(&current, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED);
    }

    current
}

/// Set a value at a dotted path. Does nothing if an intermediate object is missing.
pub fn path_set(path: &str, value: impl Into<JsValue>) {
    let (parent_path, last_key) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };

    let parent = parent_path.map(path_get).unwrap_or_else(root);

    if parent.is_undefined() || parent.is_null() {
        return;
    }

    let _ = js_sys::Reflect::set(&parent, &JsValue::from_str(last_key), &value.into());
}
