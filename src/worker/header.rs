use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::error::TaskError;
use crate::models::kind::TaskKind;
use crate::models::task::Task;
use crate::time::header_timestamp;

const SEPARATOR: &str = "#------------------------------------------";
const SIGNIFICANT_DIGITS: i32 = 6;

/// Shortest of fixed or exponent notation at six significant digits, with
/// trailing zeros dropped (`42.1235`, `1.5`, `1e-05`, `1.23457e+06`).
fn num(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };
    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!(
            "{}e{}{:02}",
            trim_zeros(mantissa),
            sign,
            exponent.abs()
        );
    }
    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
    trim_zeros(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// Writes the `#`-prefixed metadata header, truncating any existing file.
pub fn write_header(path: &Path, task: &Task) -> Result<(), TaskError> {
    let to_error = |source| TaskError::HeaderWrite {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_error)?;
    let mut out = BufWriter::new(file);
    render_header(&mut out, task).map_err(to_error)?;
    out.flush().map_err(to_error)
}

pub fn render_header(out: &mut impl Write, task: &Task) -> io::Result<()> {
    writeln!(out, "# {}", task.kind().name())?;
    writeln!(out, "# Task ID: {}", task.id())?;
    writeln!(out, "# Submit time: {}", header_timestamp(task.submit_time()))?;
    writeln!(out, "# Schedule time: {}", header_timestamp(task.schedule_time()))?;
    match task.start_time() {
        Some(start) => writeln!(out, "# Start time: {}", header_timestamp(start))?,
        None => writeln!(out, "# Start time: -")?,
    }
    writeln!(out, "# Max run time: {}h", num(task.max_run_time()))?;
    writeln!(out, "# User: {}", task.user())?;
    writeln!(out, "# Priority: {}", task.priority())?;
    writeln!(out, "# Comment: {}", task.comment())?;

    match task.kind() {
        TaskKind::DriftScan { start, int_time, .. } => {
            writeln!(out, "{}", SEPARATOR)?;
            writeln!(out, "# Coordinates: Az={} Alt={}", num(start.az), num(start.alt))?;
            writeln!(out, "# Integration time: {}s", num(*int_time))?;
        }
        TaskKind::Tracking { track, int_time, .. } => {
            writeln!(out, "{}", SEPARATOR)?;
            writeln!(out, "# Coordinates: RA={} Dec={}", num(track.ra), num(track.dec))?;
            writeln!(out, "# Integration time: {}s", num(*int_time))?;
        }
        TaskKind::HorScan {
            start,
            end,
            step_az,
            step_alt,
            int_time,
            ..
        } => {
            writeln!(out, "{}", SEPARATOR)?;
            writeln!(
                out,
                "# Start coordinates: Az={}deg Alt={}deg",
                num(start.az),
                num(start.alt)
            )?;
            writeln!(out, "# End coordinates: Az={}deg Alt={}deg", num(end.az), num(end.alt))?;
            writeln!(out, "# Step size: Az={}deg Alt={}deg", num(*step_az), num(*step_alt))?;
            writeln!(out, "# Integration time: {}s", num(*int_time))?;
        }
        TaskKind::EquScan {
            start,
            end,
            step_ra,
            step_dec,
            int_time,
            ..
        } => {
            writeln!(out, "{}", SEPARATOR)?;
            writeln!(
                out,
                "# Start coordinates: RA={}h Dec={}deg",
                num(start.ra),
                num(start.dec)
            )?;
            writeln!(out, "# End coordinates: RA={}h Dec={}deg", num(end.ra), num(end.dec))?;
            writeln!(
                out,
                "# Step size: RA={}h = {}deg  Dec={}deg",
                num(*step_ra),
                num(step_ra * 15.0),
                num(*step_dec)
            )?;
            writeln!(out, "# Integration time: {}s", num(*int_time))?;
        }
        _ => {}
    }
    Ok(())
}
