//! JSON canónico: claves de objetos ordenadas recursivamente, sin espacios.
//!
//! La forma canónica es la base de todos los hashes del workspace (hash de
//! definición de workflow, hash de outputs de step, contenido de artifacts
//! versionados). Dos valores con el mismo contenido lógico producen siempre
//! los mismos bytes, sin importar el orden de inserción de las claves.

use serde_json::{Map, Value};

/// Reconstruye `value` con las claves de cada objeto en orden lexicográfico.
///
/// Se inserta en orden ya ordenado, de modo que el resultado es estable tanto
/// si `serde_json::Map` está respaldado por `BTreeMap` como si algún crate
/// del grafo activa `preserve_order`.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for k in keys {
                out.insert(k.clone(), canonicalize(&map[k.as_str()]));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Serialización compacta y canónica de `value`.
pub fn to_canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Serialización canónica con indentación (formato de los archivos en disco).
pub fn to_canonical_pretty(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(&canonicalize(value))
}
