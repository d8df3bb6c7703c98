//! Shell command lines for each task kind.

use std::path::Path;

use crate::config::{MountConfig, SchedulerConfig};
use crate::models::kind::TaskKind;

const DEFAULT_INT_TIME: f64 = 1.0;
const DEFAULT_STEP_AZ: f64 = 1.0;
const DEFAULT_STEP_ALT: f64 = 1.0;
const DEFAULT_STEP_RA: f64 = 0.067;
const DEFAULT_STEP_DEC: f64 = 1.0;
const MIN_MAINTENANCE_SECS: f64 = 1e-3;

/// Commands issued when a task is admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// Fire-and-forget mount command run to completion before `command`.
    pub mount_command: Option<String>,
    /// Long-running command handed to the supervisor.
    pub command: String,
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_normal() && value > 0.0 {
        value
    } else {
        default
    }
}

fn in_executable_dir(executable_path: Option<&Path>, command: String) -> String {
    match executable_path {
        Some(dir) => format!("cd {} && {}", dir.display(), command),
        None => command,
    }
}

fn set_property(mount: &MountConfig, assignment: &str) -> String {
    format!(
        "echo -n $(indi_setprop -p {} \"{}.{}\")",
        mount.port, mount.device, assignment
    )
}

fn wait_for_status(mount: &MountConfig, status: &str) -> String {
    format!(
        "indi_eval -p {} -w -t {} '\"{}.SCOPE_STATUS.{}\"==1'",
        mount.port, mount.wait_timeout, mount.device, status
    )
}

/// Builds the command lines for `kind`. `data_file` is required by the
/// measurement kinds and ignored by the others.
pub fn plan(
    kind: &TaskKind,
    max_run_time: f64,
    data_file: Option<&Path>,
    config: &SchedulerConfig,
) -> LaunchPlan {
    let file = data_file
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let exec = config.executable_path.as_deref();
    let mount = &config.mount;

    let measurement = |line: String| LaunchPlan {
        mount_command: None,
        command: in_executable_dir(exec, line),
    };

    match kind {
        TaskKind::DriftScan {
            start,
            int_time,
            ref_interval,
        } => measurement(format!(
            "rt_transitscan {:.6} {:.6} {} {:.6} {}",
            start.az,
            start.alt,
            file,
            positive_or(*int_time, DEFAULT_INT_TIME),
            ref_interval
        )),
        TaskKind::Tracking {
            track,
            int_time,
            ref_interval,
        } => measurement(format!(
            "rt_tracking {:.6} {:.6} {} {:.6} {}",
            track.ra,
            track.dec,
            file,
            positive_or(*int_time, DEFAULT_INT_TIME),
            ref_interval
        )),
        TaskKind::HorScan {
            start,
            end,
            step_az,
            step_alt,
            int_time,
            ref_interval,
        } => measurement(format!(
            "rt_scan_hor {:.6} {:.6} {:.6} {:.6} {} {:.6} {:.6} {:.6} {}",
            start.az,
            end.az,
            start.alt,
            end.alt,
            file,
            positive_or(*step_az, DEFAULT_STEP_AZ),
            positive_or(*step_alt, DEFAULT_STEP_ALT),
            positive_or(*int_time, DEFAULT_INT_TIME),
            ref_interval
        )),
        TaskKind::EquScan {
            start,
            end,
            step_ra,
            step_dec,
            int_time,
            ref_interval,
        } => measurement(format!(
            "rt_scan_equ {:.6} {:.6} {:.6} {:.6} {} {:.6} {:.6} {:.6} {}",
            start.ra,
            end.ra,
            start.dec,
            end.dec,
            file,
            positive_or(*step_ra, DEFAULT_STEP_RA),
            positive_or(*step_dec, DEFAULT_STEP_DEC),
            positive_or(*int_time, DEFAULT_INT_TIME),
            ref_interval
        )),
        TaskKind::GotoHor { target } => LaunchPlan {
            mount_command: Some(set_property(
                mount,
                &format!(
                    "HORIZONTAL_EOD_COORD.AZ;ALT={:.6};{:.6}",
                    target.az, target.alt
                ),
            )),
            command: wait_for_status(mount, "SCOPE_IDLE"),
        },
        TaskKind::GotoEqu { target } => LaunchPlan {
            mount_command: Some(set_property(
                mount,
                &format!(
                    "EQUATORIAL_EOD_COORD.RA;DEC={:.6};{:.6}",
                    target.ra, target.dec
                ),
            )),
            command: wait_for_status(mount, "SCOPE_IDLE"),
        },
        TaskKind::Maintenance => {
            let secs = (max_run_time * 3600.0 - config.maintenance_margin_secs)
                .max(MIN_MAINTENANCE_SECS);
            let command = if secs.is_finite() {
                format!("sleep {:.6}", secs)
            } else {
                "sleep infinity".to_string()
            };
            LaunchPlan {
                mount_command: None,
                command,
            }
        }
        TaskKind::Park => LaunchPlan {
            mount_command: Some(set_property(mount, "TELESCOPE_PARK.PARK=On")),
            command: wait_for_status(mount, "SCOPE_PARKED"),
        },
        TaskKind::Unpark => LaunchPlan {
            mount_command: Some(set_property(mount, "TELESCOPE_PARK.UNPARK=On")),
            command: wait_for_status(mount, "SCOPE_IDLE"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::models::kind::{EquCoords, HorCoords};

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    #[test]
    fn drift_scan_runs_from_executable_dir() {
        let mut config = config();
        config.executable_path = Some(PathBuf::from("/opt/rt/bin"));
        let kind = TaskKind::DriftScan {
            start: HorCoords { az: 180.0, alt: 42.5 },
            int_time: 2.0,
            ref_interval: 10,
        };
        let plan = plan(&kind, 1.0, Some(Path::new("/data/task_drift")), &config);
        assert_eq!(plan.mount_command, None);
        assert_eq!(
            plan.command,
            "cd /opt/rt/bin && rt_transitscan 180.000000 42.500000 /data/task_drift 2.000000 10"
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-3.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn tracking_substitutes_default_int_time(#[case] int_time: f64) {
        let kind = TaskKind::Tracking {
            track: EquCoords { ra: 5.5, dec: 22.0 },
            int_time,
            ref_interval: 0,
        };
        let plan = plan(&kind, 1.0, Some(Path::new("task_track")), &config());
        assert_eq!(
            plan.command,
            "rt_tracking 5.500000 22.000000 task_track 1.000000 0"
        );
    }

    #[test]
    fn scans_interleave_start_and_end_coordinates() {
        let hor = TaskKind::HorScan {
            start: HorCoords { az: 10.0, alt: 20.0 },
            end: HorCoords { az: 30.0, alt: 40.0 },
            step_az: 0.5,
            step_alt: 0.0,
            int_time: 0.0,
            ref_interval: 3,
        };
        assert_eq!(
            plan(&hor, 1.0, Some(Path::new("f")), &config()).command,
            "rt_scan_hor 10.000000 30.000000 20.000000 40.000000 f 0.500000 1.000000 1.000000 3"
        );

        let equ = TaskKind::EquScan {
            start: EquCoords { ra: 1.0, dec: -5.0 },
            end: EquCoords { ra: 2.0, dec: 5.0 },
            step_ra: 0.0,
            step_dec: 0.25,
            int_time: 4.0,
            ref_interval: 0,
        };
        assert_eq!(
            plan(&equ, 1.0, Some(Path::new("f")), &config()).command,
            "rt_scan_equ 1.000000 2.000000 -5.000000 5.000000 f 0.067000 0.250000 4.000000 0"
        );
    }

    #[test]
    fn goto_sets_property_then_waits_for_idle() {
        let kind = TaskKind::GotoHor {
            target: HorCoords { az: 90.0, alt: 15.0 },
        };
        let plan = plan(&kind, 0.2, None, &config());
        assert_eq!(
            plan.mount_command.as_deref(),
            Some(
                "echo -n $(indi_setprop -p 7624 \"Pi Radiotelescope.HORIZONTAL_EOD_COORD.AZ;ALT=90.000000;15.000000\")"
            )
        );
        assert_eq!(
            plan.command,
            "indi_eval -p 7624 -w -t 100 '\"Pi Radiotelescope.SCOPE_STATUS.SCOPE_IDLE\"==1'"
        );
    }

    #[test]
    fn park_waits_for_parked_status() {
        let plan = plan(&TaskKind::Park, 0.2, None, &config());
        assert_eq!(
            plan.mount_command.as_deref(),
            Some("echo -n $(indi_setprop -p 7624 \"Pi Radiotelescope.TELESCOPE_PARK.PARK=On\")")
        );
        assert!(plan.command.contains("SCOPE_PARKED"));
    }

    #[rstest]
    #[case(1.0, "sleep 3599.750000")]
    #[case(0.0, "sleep 0.001000")]
    #[case(f64::INFINITY, "sleep infinity")]
    fn maintenance_sleeps_for_run_time_minus_margin(#[case] hours: f64, #[case] expected: &str) {
        let mut config = config();
        config.executable_path = Some(PathBuf::from("/ignored"));
        assert_eq!(plan(&TaskKind::Maintenance, hours, None, &config).command, expected);
    }
}
