//! Lookup tables for the positional codes in JASMES product filenames.
//!
//! Every code that can appear in a filename maps to a closed enum. The
//! enums carry their descriptive metadata (variable descriptions and units,
//! sample widths and fill values) so that no string table is needed at
//! runtime.

use serde::{Deserialize, Serialize};

/// Satellite instrument that produced a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    /// Terra MODIS
    TerraModis,
    /// Aqua MODIS
    AquaModis,
    /// Terra & Aqua MODIS average
    ModisAverage,
    /// SeaWiFS
    SeaWifs,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::TerraModis,
        Instrument::AquaModis,
        Instrument::ModisAverage,
        Instrument::SeaWifs,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "MOD" => Some(Instrument::TerraModis),
            "MYD" => Some(Instrument::AquaModis),
            "MDS" => Some(Instrument::ModisAverage),
            "SWF" => Some(Instrument::SeaWifs),
            _ => None,
        }
    }

    /// Three-letter code used in filenames.
    pub fn code(&self) -> &'static str {
        match self {
            Instrument::TerraModis => "MOD",
            Instrument::AquaModis => "MYD",
            Instrument::ModisAverage => "MDS",
            Instrument::SeaWifs => "SWF",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Instrument::TerraModis => "Terra MODIS",
            Instrument::AquaModis => "Aqua MODIS",
            Instrument::ModisAverage => "Terra & Aqua MODIS average",
            Instrument::SeaWifs => "SeaWiFS",
        }
    }
}

/// Temporal averaging period of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Average {
    Daily,
    Monthly,
    HalfMonth,
}

impl Average {
    pub const ALL: [Average; 3] = [Average::Daily, Average::Monthly, Average::HalfMonth];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Av1" => Some(Average::Daily),
            "Avm" => Some(Average::Monthly),
            "Avh" => Some(Average::HalfMonth),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Average::Daily => "Av1",
            Average::Monthly => "Avm",
            Average::HalfMonth => "Avh",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Average::Daily => "daily average",
            Average::Monthly => "monthly average",
            Average::HalfMonth => "half-month average",
        }
    }
}

/// Physical quantity stored in a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    Par,
    DirectPar,
    ShortwaveRadiation,
    ParTransmittance,
    Uva,
    Uvb,
    ReflectancePar,
    SurfaceTemperature,
}

impl Variable {
    pub const ALL: [Variable; 8] = [
        Variable::Par,
        Variable::DirectPar,
        Variable::ShortwaveRadiation,
        Variable::ParTransmittance,
        Variable::Uva,
        Variable::Uvb,
        Variable::ReflectancePar,
        Variable::SurfaceTemperature,
    ];

    /// Look up a variable by its code with any underscore padding removed.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "par" => Some(Variable::Par),
            "dpar" => Some(Variable::DirectPar),
            "swr" => Some(Variable::ShortwaveRadiation),
            "tip" => Some(Variable::ParTransmittance),
            "uva" => Some(Variable::Uva),
            "uvb" => Some(Variable::Uvb),
            "rpar" => Some(Variable::ReflectancePar),
            "lst" => Some(Variable::SurfaceTemperature),
            _ => None,
        }
    }

    /// Short code, also used as the data variable name in output files.
    pub fn code(&self) -> &'static str {
        match self {
            Variable::Par => "par",
            Variable::DirectPar => "dpar",
            Variable::ShortwaveRadiation => "swr",
            Variable::ParTransmittance => "tip",
            Variable::Uva => "uva",
            Variable::Uvb => "uvb",
            Variable::ReflectancePar => "rpar",
            Variable::SurfaceTemperature => "lst",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variable::Par => "daily PAR",
            Variable::DirectPar => "direct PAR",
            Variable::ShortwaveRadiation => "mean shortwave radiation",
            Variable::ParTransmittance => "transmittance of instantaneous PAR at noon",
            Variable::Uva => "UVA",
            Variable::Uvb => "UVB",
            Variable::ReflectancePar => {
                "surface reflectance weighted by PAR wavelengths & solar irradiance"
            }
            Variable::SurfaceTemperature => "surface temperature (not validated)",
        }
    }

    /// Physical unit; empty for dimensionless or unpublished units.
    pub fn unit(&self) -> &'static str {
        match self {
            Variable::Par => "Ein/m^2/day",
            Variable::ShortwaveRadiation | Variable::Uva | Variable::Uvb => "W/m^2",
            _ => "",
        }
    }
}

/// On-disk sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian, fill value -1
    I16Le,
    /// Unsigned 8-bit, fill value 255
    U8,
}

impl SampleEncoding {
    pub const ALL: [SampleEncoding; 2] = [SampleEncoding::I16Le, SampleEncoding::U8];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "le" => Some(SampleEncoding::I16Le),
            "8b" => Some(SampleEncoding::U8),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SampleEncoding::I16Le => "le",
            SampleEncoding::U8 => "8b",
        }
    }

    /// Width of one sample in bytes.
    pub fn width(&self) -> usize {
        match self {
            SampleEncoding::I16Le => 2,
            SampleEncoding::U8 => 1,
        }
    }

    /// Raw value meaning "no data".
    pub fn fill_value(&self) -> i32 {
        match self {
            SampleEncoding::I16Le => -1,
            SampleEncoding::U8 => 255,
        }
    }

    /// Inclusive range of raw values representable in this encoding.
    pub fn raw_range(&self) -> (i32, i32) {
        match self {
            SampleEncoding::I16Le => (i16::MIN as i32, i16::MAX as i32),
            SampleEncoding::U8 => (u8::MIN as i32, u8::MAX as i32),
        }
    }
}
