/// Status code type alias, a compact numeric error domain.
#[allow(non_camel_case_types)]
pub type status_code_t = u16;

/// Common status codes (0-999).
pub mod StatusCode {
    use super::status_code_t;

    pub const OK: status_code_t = 0;
    pub const NOT_IMPLEMENTED: status_code_t = 1;
    pub const DATA_CORRUPTION: status_code_t = 2;
    pub const INVALID_ARG: status_code_t = 3;
    pub const INVALID_CONFIG: status_code_t = 4;
    pub const CONFIG_PARSE_ERROR: status_code_t = 5;
    pub const KV_STORE_NOT_FOUND: status_code_t = 60;
    pub const KV_STORE_GET_ERROR: status_code_t = 61;
    pub const KV_STORE_SET_ERROR: status_code_t = 62;
    pub const KV_STORE_OPEN_FAILED: status_code_t = 63;
    pub const KV_STORE_ITERATE_ERROR: status_code_t = 68;
    pub const IO_ERROR: status_code_t = 69;
    pub const UNKNOWN: status_code_t = 999;
}

/// Metadata layer status codes (3xxx).
pub mod MetaCode {
    use super::status_code_t;

    pub const NOT_FOUND: status_code_t = 3000;
    pub const EXISTS: status_code_t = 3007;
    pub const MALFORMED_KEY: status_code_t = 3020;
    pub const MALFORMED_RECORD: status_code_t = 3021;
    pub const NAME_MISMATCH: status_code_t = 3022;
}

/// Key registry status codes (9xxx).
pub mod RegistryCode {
    use super::status_code_t;

    pub const KEY_SPACE_EXHAUSTED: status_code_t = 9000;
    pub const KEY_MISMATCH: status_code_t = 9001;
    pub const NOT_FOUND: status_code_t = 9002;
}

/// Classification of status code ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCodeType {
    Invalid,
    Common,
    Meta,
    Registry,
}

/// Determine the type/category of a status code.
pub fn type_of(code: status_code_t) -> StatusCodeType {
    match code {
        0..=999 => StatusCodeType::Common,
        3000..=3999 => StatusCodeType::Meta,
        9000..=9999 => StatusCodeType::Registry,
        _ => StatusCodeType::Invalid,
    }
}

/// Convert a status code to its human-readable name.
pub fn to_string(code: status_code_t) -> &'static str {
    match code {
        StatusCode::OK => "OK",
        StatusCode::NOT_IMPLEMENTED => "NotImplemented",
        StatusCode::DATA_CORRUPTION => "DataCorruption",
        StatusCode::INVALID_ARG => "InvalidArg",
        StatusCode::INVALID_CONFIG => "InvalidConfig",
        StatusCode::CONFIG_PARSE_ERROR => "ConfigParseError",
        StatusCode::KV_STORE_NOT_FOUND => "KVStoreNotFound",
        StatusCode::KV_STORE_GET_ERROR => "KVStoreGetError",
        StatusCode::KV_STORE_SET_ERROR => "KVStoreSetError",
        StatusCode::KV_STORE_OPEN_FAILED => "KVStoreOpenFailed",
        StatusCode::KV_STORE_ITERATE_ERROR => "KVStoreIterateError",
        StatusCode::IO_ERROR => "IOError",
        StatusCode::UNKNOWN => "Unknown",

        MetaCode::NOT_FOUND => "Meta::NotFound",
        MetaCode::EXISTS => "Meta::Exists",
        MetaCode::MALFORMED_KEY => "Meta::MalformedKey",
        MetaCode::MALFORMED_RECORD => "Meta::MalformedRecord",
        MetaCode::NAME_MISMATCH => "Meta::NameMismatch",

        RegistryCode::KEY_SPACE_EXHAUSTED => "Registry::KeySpaceExhausted",
        RegistryCode::KEY_MISMATCH => "Registry::KeyMismatch",
        RegistryCode::NOT_FOUND => "Registry::NotFound",

        _ => "UnknownStatusCode",
    }
}

/// Convert a status code to the corresponding POSIX errno value.
///
/// Absence maps to ENOENT, duplicate creation to EEXIST; corruption and
/// backing-store failures map to a generic EIO.
pub fn to_errno(code: status_code_t) -> i32 {
    match code {
        c if c == MetaCode::NOT_FOUND => libc::ENOENT,
        c if c == MetaCode::EXISTS => libc::EEXIST,
        c if c == StatusCode::INVALID_ARG => libc::EINVAL,
        c if c == StatusCode::NOT_IMPLEMENTED => libc::ENOSYS,
        _ => libc::EIO,
    }
}
