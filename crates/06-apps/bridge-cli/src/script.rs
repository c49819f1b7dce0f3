//! Line-oriented session scripts.
//!
//! ```text
//! # comments and blank lines are ignored
//! rom 512k
//! insert 0 workbench.adf
//! run
//! wait 200
//! serial hello
//! modal requester 50
//! power-off
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use core_abi::Geometry;
use world::WarpMode;

/// Session used when no script is given.
pub const DEMO: &str = "\
rom 256k
insert-blank 0 Empty
run
wait 150
serial hello
wait 150
warp on
wait 60
warp auto
modal requester 80
eject 0
attach-hd 0 64 2 32
power-off
wait 40
";

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Installs a zero-filled Kickstart image of the given size in KiB.
    BlankRom(usize),
    Rom(PathBuf),
    Insert { drive: usize, path: PathBuf },
    InsertBlank { drive: usize, name: String },
    Eject(usize),
    AttachHd { slot: usize, geometry: Geometry },
    Run,
    Pause,
    PowerOff,
    Warp(WarpMode),
    /// Bytes the emulated machine writes to its serial port.
    Serial(String),
    /// Keeps the scheduler running for a while.
    Wait(Duration),
    /// Shows a modal, joins it from a helper thread, closes it after a delay.
    Modal { label: String, after: Duration },
}

pub fn parse(text: &str) -> Result<Vec<Step>> {
    text.lines()
        .enumerate()
        .filter_map(|(n, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then_some((n + 1, line))
        })
        .map(|(n, line)| parse_line(line).with_context(|| format!("line {n}: {line:?}")))
        .collect()
}

fn parse_line(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let mut next = |what: &str| words.next().ok_or_else(|| anyhow!("missing {what}"));
    let step = match verb {
        "rom" => {
            let arg = next("ROM path or size")?;
            match arg.strip_suffix('k').map(str::parse::<usize>) {
                Some(Ok(kib)) => Step::BlankRom(kib),
                _ => Step::Rom(arg.into()),
            }
        }
        "insert" => Step::Insert {
            drive: number(next("drive")?)?,
            path: next("disk path")?.into(),
        },
        "insert-blank" => Step::InsertBlank {
            drive: number(next("drive")?)?,
            name: next("volume name").unwrap_or("Empty").to_string(),
        },
        "eject" => Step::Eject(number(next("drive")?)?),
        "attach-hd" => {
            let slot = number(next("slot")?)?;
            let cylinders = number(next("cylinders")?)?;
            let heads = number(next("heads")?)?;
            let sectors = number(next("sectors")?)?;
            Step::AttachHd {
                slot,
                geometry: Geometry::new(cylinders, heads, sectors),
            }
        }
        "run" => Step::Run,
        "pause" => Step::Pause,
        "power-off" => Step::PowerOff,
        "warp" => Step::Warp(match next("warp mode")? {
            "auto" => WarpMode::Auto,
            "on" => WarpMode::On,
            "off" => WarpMode::Off,
            other => bail!("unknown warp mode {other:?}"),
        }),
        "serial" => match line[verb.len()..].trim() {
            "" => bail!("missing serial text"),
            text => Step::Serial(text.to_string()),
        },
        "wait" => Step::Wait(Duration::from_millis(number(next("milliseconds")?)?)),
        "modal" => Step::Modal {
            label: next("label")?.to_string(),
            after: Duration::from_millis(number(next("milliseconds")?)?),
        },
        other => bail!("unknown step {other:?}"),
    };
    Ok(step)
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T> {
    word.parse().map_err(|_| anyhow!("expected a number, got {word:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_script_parses() {
        let steps = parse(DEMO).unwrap();
        assert_eq!(steps.first(), Some(&Step::BlankRom(256)));
        assert!(steps.contains(&Step::Warp(WarpMode::On)));
        assert!(steps.contains(&Step::AttachHd {
            slot: 0,
            geometry: Geometry::new(64, 2, 32),
        }));
    }

    #[test]
    fn comments_and_paths() {
        let steps = parse("# setup\nrom kick13.rom  # A500\n\ninsert 1 disks/wb.adf\nserial AT Z").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Rom("kick13.rom".into()),
                Step::Insert {
                    drive: 1,
                    path: "disks/wb.adf".into()
                },
                Step::Serial("AT Z".into()),
            ]
        );
    }

    #[test]
    fn errors_name_the_line() {
        let err = parse("run\nwarp sideways").unwrap_err();
        assert_eq!(err.to_string(), "line 2: \"warp sideways\"");
        assert!(format!("{err:#}").contains("unknown warp mode"));
        assert!(parse("eject").is_err());
        assert!(parse("wait soon").is_err());
    }
}
