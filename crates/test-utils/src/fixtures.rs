//! Common test fixtures for jasmes-uvr tests.

/// A real archive filename (Terra MODIS, daily UV-B, 2019-11-05).
pub const SAMPLE_NAME: &str = "MOD02SSH_A20191105Av1_v811_7200_3601_uvb__le";

/// The same product as it appears on the FTP server.
pub const SAMPLE_REMOTE_NAME: &str = "MOD02SSH_A20191105Av1_v811_7200_3601_uvb__le.gz";

/// Valid codes for each positional filename field.
pub mod codes {
    pub const INSTRUMENTS: [&str; 4] = ["MOD", "MYD", "MDS", "SWF"];
    pub const AVERAGES: [&str; 3] = ["Av1", "Avm", "Avh"];
    pub const VARIABLES: [&str; 8] = ["par", "dpar", "swr", "tip", "uva", "uvb", "rpar", "lst"];
    pub const ENCODINGS: [&str; 2] = ["le", "8b"];
}
