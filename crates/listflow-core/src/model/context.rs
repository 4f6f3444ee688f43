//! Contexto compartido de una corrida.
//!
//! El `Context` acumula las salidas de los steps bajo su `context_key`. Es
//! propiedad exclusiva del orquestador: los handlers sólo reciben un
//! `ContextSnapshot` inmutable tomado antes de invocarlos.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ruta con puntos (`a.b.0.c`) sobre un árbol JSON.
///
/// Los segmentos numéricos indexan arrays; sobre objetos se usan como clave
/// literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath {
    segments: Vec<String>,
}

impl ValuePath {
    /// Parsea una ruta con puntos. Segmentos vacíos (`a..b`) se descartan.
    pub fn parse(raw: &str) -> Self {
        let segments = raw.split('.')
                          .filter(|s| !s.is_empty())
                          .map(str::to_string)
                          .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Recorre `root` siguiendo los segmentos restantes.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        lookup_segments(root, &self.segments)
    }
}

fn lookup_segments<'v>(root: &'v Value, segments: &[String]) -> Option<&'v Value> {
    let mut current = root;
    for seg in segments {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mapa ordenado `context_key → valor` de la corrida en curso.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    entries: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruye un contexto desde un objeto JSON (p.ej. `production_data`
    /// de un run-state persistido). Valores no-objeto producen un contexto
    /// vacío.
    pub fn from_value(value: &Value) -> Self {
        let entries = match value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => IndexMap::new(),
        };
        Self { entries }
    }

    /// Inserta (o reemplaza: last-write-wins) la salida de un step.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Resuelve una ruta con puntos: el primer segmento es la clave de
    /// contexto, el resto navega dentro del valor.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let parsed = ValuePath::parse(path);
        let (head, rest) = parsed.segments().split_first()?;
        let root = self.entries.get(head)?;
        lookup_segments(root, rest)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Vista JSON del contexto completo (orden de inserción preservado en la
    /// iteración; la serialización canónica lo reordena al hashear).
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Copia inmutable para entregar a un handler.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot { inner: self.clone() }
    }
}

/// Copia de sólo lectura del contexto entregada a los handlers.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    inner: Context,
}

impl ContextSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn get_path(&self, path: &str) -> Option<&Value> {
        self.inner.get_path(path)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn to_value(&self) -> Value {
        self.inner.to_value()
    }
}
