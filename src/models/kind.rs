use serde::Deserialize;

/// Azimuth/altitude pair, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct HorCoords {
    pub az: f64,
    pub alt: f64,
}

/// Right ascension (hours) and declination (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct EquCoords {
    pub ra: f64,
    pub dec: f64,
}

/// What a task does once admitted. Numeric parameters left at zero (or set
/// to anything non-finite or negative) fall back to defaults when the
/// command line is built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    DriftScan {
        start: HorCoords,
        #[serde(default)]
        int_time: f64,
        #[serde(default)]
        ref_interval: u32,
    },
    Tracking {
        track: EquCoords,
        #[serde(default)]
        int_time: f64,
        #[serde(default)]
        ref_interval: u32,
    },
    HorScan {
        start: HorCoords,
        end: HorCoords,
        #[serde(default)]
        step_az: f64,
        #[serde(default)]
        step_alt: f64,
        #[serde(default)]
        int_time: f64,
        #[serde(default)]
        ref_interval: u32,
    },
    EquScan {
        start: EquCoords,
        end: EquCoords,
        #[serde(default)]
        step_ra: f64,
        #[serde(default)]
        step_dec: f64,
        #[serde(default)]
        int_time: f64,
        #[serde(default)]
        ref_interval: u32,
    },
    GotoHor {
        target: HorCoords,
    },
    GotoEqu {
        target: EquCoords,
    },
    Maintenance,
    Park,
    Unpark,
}

impl TaskKind {
    /// Human readable type name, first line of the data file header.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::DriftScan { .. } => "Drift Scan",
            TaskKind::Tracking { .. } => "Tracking",
            TaskKind::HorScan { .. } => "Horizontal Scan",
            TaskKind::EquScan { .. } => "Equatorial Scan",
            TaskKind::GotoHor { .. } => "Goto Horizontal",
            TaskKind::GotoEqu { .. } => "Goto Equatorial",
            TaskKind::Maintenance => "Maintenance",
            TaskKind::Park => "Park",
            TaskKind::Unpark => "Unpark",
        }
    }

    /// Short lowercase label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::DriftScan { .. } => "driftscan",
            TaskKind::Tracking { .. } => "tracking",
            TaskKind::HorScan { .. } => "horscan",
            TaskKind::EquScan { .. } => "equscan",
            TaskKind::GotoHor { .. } => "goto-hor",
            TaskKind::GotoEqu { .. } => "goto-equ",
            TaskKind::Maintenance => "maintenance",
            TaskKind::Park => "park",
            TaskKind::Unpark => "unpark",
        }
    }

    /// Data file prefix; `None` for kinds that produce no data file.
    pub fn file_tag(&self) -> Option<&'static str> {
        match self {
            TaskKind::DriftScan { .. } => Some("drift"),
            TaskKind::Tracking { .. } => Some("track"),
            TaskKind::HorScan { .. } => Some("horscan"),
            TaskKind::EquScan { .. } => Some("equscan"),
            _ => None,
        }
    }
}
