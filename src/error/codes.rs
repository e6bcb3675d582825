/// Error code registry for sm-composer
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration loading errors
/// - 3000-3999: Storage (file output) errors
/// - 4000-4999: Schedule record errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_INVALID_TOML: u16 = 1004;
    pub const CONFIG_UNSUPPORTED_FORMAT: u16 = 1005;
    pub const CONFIG_INVALID_OVERRIDE: u16 = 1006;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3005;
    pub const STORAGE_SERIALIZATION_ERROR: u16 = 3011;

    // Schedule errors (4000-4999)
    pub const SCHEDULE_GENERIC: u16 = 4000;
    pub const SCHEDULE_INVALID_RECORD: u16 = 4001;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_DEPENDENCY_MISSING: u16 = 7001;
    pub const VALIDATION_OUT_OF_RANGE: u16 = 7003;
    pub const VALIDATION_PATTERN_MISMATCH: u16 = 7004;
    pub const VALIDATION_INVALID_INPUT: u16 = 7008;
    pub const VALIDATION_FAILED: u16 = 7010;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_INTERNAL_ERROR: u16 = 9004;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1003 => "Invalid JSON syntax in configuration",
        1004 => "Invalid TOML syntax in configuration",
        1005 => "Unsupported configuration file format",
        1006 => "Invalid environment override",

        // Storage errors
        3000 => "Generic storage error",
        3001 => "Storage I/O error",
        3002 => "Storage permission denied",
        3004 => "Storage item not found",
        3005 => "Storage item already exists",
        3011 => "Storage serialization error",

        // Schedule errors
        4000 => "Generic schedule error",
        4001 => "Schedule record is malformed",

        // Validation errors
        7000 => "Generic validation error",
        7001 => "Enabled feature is missing a required value",
        7003 => "Value out of allowed range",
        7004 => "Value doesn't match required pattern",
        7008 => "Invalid input",
        7010 => "Configuration failed validation",

        // Other errors
        9000 => "Generic error",
        9004 => "Internal error",

        _ => "Unknown error code",
    }
}
