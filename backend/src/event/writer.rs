//! Event output
//!
//! The run driver hands every filtered record to an [`EventWriter`]. Two
//! formats ship with the crate:
//!
//! - **ascii**: one `E` line per event followed by one `P` line per particle
//! - **json**: one JSON object per line (`serde_json`)
//!
//! Both print momenta with a caller-chosen number of significant digits.
//! Rounding happens here, at emission time; records are never modified.
//!
//! # ASCII Layout
//!
//! ```text
//! EVGEN-ASCII 1
//! R <run-id> <generator> <beam-a> <beam-b> <seed> <filter-level>
//! E <event-number> <process-id> <weight> <n-particles>
//! P <id> <pdg> <status> <px> <py> <pz> <e> <parents|->
//! END
//! ```
//!
//! `<status>` is [`ParticleStatus::code`](super::ParticleStatus::code):
//!
//! | code | status        |
//! |------|---------------|
//! | 1    | stable        |
//! | 2    | decayed       |
//! | 3    | documentation |
//! | 4    | beam          |
//! | 11   | beam remnant  |
//! | 12   | intermediate  |
//!
//! Any other value is a native code with no canonical meaning, written as-is.

use super::EventRecord;
use crate::beams::BeamSpec;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Number of significant digits printed for momentum components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision(u8);

impl Precision {
    /// Largest useful precision for an `f64`
    pub const MAX: u8 = 17;

    /// Create a precision of `digits` significant digits (1..=17)
    pub fn new(digits: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&digits).then_some(Self(digits))
    }

    pub fn digits(self) -> u8 {
        self.0
    }

    /// Format `value` in scientific notation with this many significant digits
    pub fn format(self, value: f64) -> String {
        format!("{:.*e}", usize::from(self.0 - 1), value)
    }

    /// Round `value` to this many significant digits
    pub fn round(self, value: f64) -> f64 {
        self.format(value).parse().unwrap_or(value)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self(8)
    }
}

/// Run-level information written once, before the first event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHeader {
    pub run_id: String,
    pub generator: String,
    pub beam_a: BeamSpec,
    pub beam_b: BeamSpec,
    pub seed: u64,
    pub filter_level: u8,
}

/// Output collaborator of the run driver
pub trait EventWriter {
    /// Write run-level information
    fn write_header(&mut self, header: &RunHeader) -> io::Result<()>;

    /// Write one (already filtered) event
    fn write_event(&mut self, record: &EventRecord) -> io::Result<()>;

    /// Write any trailer and flush
    fn finish(&mut self) -> io::Result<()>;
}

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Ascii,
    Json,
}

impl OutputFormat {
    /// Box a writer of this format around `out`
    pub fn writer<W: Write + 'static>(self, out: W, precision: Precision) -> Box<dyn EventWriter> {
        match self {
            OutputFormat::Ascii => Box::new(AsciiWriter::new(out, precision)),
            OutputFormat::Json => Box::new(JsonLinesWriter::new(out, precision)),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" | "text" => Ok(OutputFormat::Ascii),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

// ============================================================================
// ASCII
// ============================================================================

/// Line-oriented text writer
pub struct AsciiWriter<W: Write> {
    out: W,
    precision: Precision,
    started: bool,
}

impl<W: Write> AsciiWriter<W> {
    pub fn new(out: W, precision: Precision) -> Self {
        Self {
            out,
            precision,
            started: false,
        }
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ensure_banner(&mut self) -> io::Result<()> {
        if !self.started {
            writeln!(self.out, "EVGEN-ASCII 1")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> EventWriter for AsciiWriter<W> {
    fn write_header(&mut self, header: &RunHeader) -> io::Result<()> {
        self.ensure_banner()?;
        writeln!(
            self.out,
            "R {} {} {} {} {} {}",
            header.run_id,
            header.generator,
            header.beam_a,
            header.beam_b,
            header.seed,
            header.filter_level
        )
    }

    fn write_event(&mut self, record: &EventRecord) -> io::Result<()> {
        self.ensure_banner()?;
        let fmt = self.precision;
        writeln!(
            self.out,
            "E {} {} {} {}",
            record.event_number,
            record.process_id,
            fmt.format(record.weight),
            record.len()
        )?;

        for p in &record.particles {
            let parents = if p.parents.is_empty() {
                "-".to_string()
            } else {
                p.parents
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            writeln!(
                self.out,
                "P {} {} {} {} {} {} {} {}",
                p.id,
                p.pdg_id,
                p.status.code(),
                fmt.format(p.momentum.px),
                fmt.format(p.momentum.py),
                fmt.format(p.momentum.pz),
                fmt.format(p.momentum.e),
                parents
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.ensure_banner()?;
        writeln!(self.out, "END")?;
        self.out.flush()
    }
}

// ============================================================================
// JSON lines
// ============================================================================

/// One JSON document per line
pub struct JsonLinesWriter<W: Write> {
    out: W,
    precision: Precision,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W, precision: Precision) -> Self {
        Self { out, precision }
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[derive(Serialize)]
struct HeaderLine<'a> {
    run: &'a RunHeader,
}

impl<W: Write> EventWriter for JsonLinesWriter<W> {
    fn write_header(&mut self, header: &RunHeader) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &HeaderLine { run: header })?;
        writeln!(self.out)
    }

    fn write_event(&mut self, record: &EventRecord) -> io::Result<()> {
        let fmt = self.precision;
        let mut rounded = record.clone();
        rounded.weight = fmt.round(rounded.weight);
        for p in &mut rounded.particles {
            p.momentum.px = fmt.round(p.momentum.px);
            p.momentum.py = fmt.round(p.momentum.py);
            p.momentum.pz = fmt.round(p.momentum.pz);
            p.momentum.e = fmt.round(p.momentum.e);
        }
        serde_json::to_writer(&mut self.out, &rounded)?;
        writeln!(self.out)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FourMomentum, Particle, ParticleStatus};

    fn record() -> EventRecord {
        EventRecord {
            event_number: 3,
            weight: 1.0,
            process_id: 11,
            particles: vec![
                Particle {
                    id: 1,
                    pdg_id: 2212,
                    momentum: FourMomentum::new(0.0, 0.0, 450.0, 450.000978),
                    status: ParticleStatus::Beam,
                    parents: vec![],
                    children: vec![2],
                },
                Particle {
                    id: 2,
                    pdg_id: 211,
                    momentum: FourMomentum::new(0.123456789, -1.5, 2.0, 2.53),
                    status: ParticleStatus::Stable,
                    parents: vec![1],
                    children: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_precision_bounds() {
        assert!(Precision::new(0).is_none());
        assert!(Precision::new(18).is_none());
        assert_eq!(Precision::new(3).unwrap().format(0.123456), "1.23e-1");
        assert_eq!(Precision::new(3).unwrap().round(0.123456), 0.123);
    }

    #[test]
    fn test_ascii_layout() {
        let mut writer = AsciiWriter::new(Vec::new(), Precision::new(4).unwrap());
        writer.write_event(&record()).unwrap();
        writer.finish().unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "EVGEN-ASCII 1");
        assert_eq!(lines[1], "E 3 11 1.000e0 2");
        assert_eq!(lines[2], "P 1 2212 4 0.000e0 0.000e0 4.500e2 4.500e2 -");
        assert_eq!(lines[3], "P 2 211 1 1.235e-1 -1.500e0 2.000e0 2.530e0 1");
        assert_eq!(lines[4], "END");
    }

    #[test]
    fn test_json_lines_round_momenta() {
        let mut writer = JsonLinesWriter::new(Vec::new(), Precision::new(3).unwrap());
        writer.write_event(&record()).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        let parsed: EventRecord = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed.particles[1].momentum.px, 0.123);
        assert_eq!(parsed.particles[0].momentum.e, 450.0);
        assert_eq!(parsed.particles[1].parents, vec![1]);
    }
}
