use serde::{Serialize, de::DeserializeOwned};
use wasm_bindgen::JsValue;

/// Error type for serialization/deserialization operations
#[derive(Debug)]
pub enum Error {
    SerdeWasmBindgen(serde_wasm_bindgen::Error),
    JsSys(JsValue),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SerdeWasmBindgen(e) => write!(f, "Serde WASM Bindgen Error: {}", e),
            Error::JsSys(v) => write!(f, "JS Sys Error: {:?}", v),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_wasm_bindgen::Error> for Error {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        Error::SerdeWasmBindgen(e)
    }
}

/// Serialize a Rust value into a plain JS object
///
/// Maps become plain objects (not `Map`) so the Maps SDK accepts them as option literals.
pub fn to_value<T: Serialize>(value: &T) -> Result<JsValue, Error> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).map_err(Error::from)
}

/// Deserialize a JsValue into a Rust data structure
pub fn from_value<T: DeserializeOwned>(value: JsValue) -> Result<T, Error> {
    serde_wasm_bindgen::from_value(value).map_err(Error::from)
}

/// Build a JS object from already-converted values
///
/// Used where an option literal must carry live SDK objects (a map, an anchor).
pub fn object(entries: &[(&str, &JsValue)]) -> Result<JsValue, Error> {
    let obj = js_sys::Object::new();
    for (key, value) in entries {
        js_sys::Reflect::set(&obj, &JsValue::from_str(key), value).map_err(Error::JsSys)?;
    }
    Ok(obj.into())
}

/// Read a string property, e.g. the `code` of a rejected Maps request
pub fn string_field(value: &JsValue, key: &str) -> Option<String> {
    js_sys::Reflect::get(value, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
}
