//! Constantes del motor core.
//!
//! Valores estáticos que participan en los fingerprints de corrida y en los
//! defaults de las políticas. `ENGINE_VERSION` forma parte del input del
//! hashing: cambiarlo invalida los fingerprints aunque la definición y los
//! datos no cambien.

/// Versión lógica del motor. Se incluye en el fingerprint de cada corrida.
pub const ENGINE_VERSION: &str = "L1.0";

/// Timeout por defecto de la sesión (1 hora).
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 3600;

/// Máximo de actualizaciones por defecto antes de frenar la sesión.
pub const DEFAULT_MAX_UPDATES: u64 = 1000;

/// Cota por defecto de saltos `fallback_next` dentro de una corrida.
pub const DEFAULT_MAX_FALLBACK_JUMPS: u32 = 64;

/// Prefijo que marca un puntero al contexto dentro de `$ref`.
pub const CONTEXT_REF_PREFIX: &str = "context.";

/// Clave de un puntero a contexto en los inputs de un step.
pub const REF_KEY: &str = "$ref";

/// Clave de una referencia a perfil en los inputs de un step.
pub const PROFILE_KEY: &str = "$profile";

/// Clave de herencia dentro de un perfil.
pub const INHERITS_KEY: &str = "inherits";
