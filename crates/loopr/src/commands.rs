//! Stdin command parsing
//!
//! Each line maps onto one Track entry point. Pointer positions are in
//! virtual pixels (`display.width` wide); `loop` takes view percentages.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use loopr_core::track::{key, KeyEvent};

/// One parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A key press forwarded to the Track
    Key(KeyEvent),
    PointerDown { x: f64, shift: bool },
    PointerMove { x: f64 },
    PointerUp { x: f64 },
    /// Full down/up gesture between two view percentages
    Loop { start: f64, end: f64 },
    Alpha(f64),
    /// Alpha from a slider position in [0, 1]
    Slider(f64),
    Open(PathBuf),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  space | shift+space | esc     toggle / stop / stop
  z | shift+z                   zoom in / zoom out
  down <x> [shift]              pointer down at pixel x
  move <x>                      pointer move
  up <x>                        pointer up
  loop <start> <end>            select a region (0..1 of the view)
  alpha <f>                     set stretch factor
  slider <p>                    set stretch from slider position 0..1
  open <file>                   load another file
  status                        show playback state
  quit";

/// Parse a line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "space" => Command::Key(KeyEvent::new(key::SPACE)),
        "shift+space" => Command::Key(KeyEvent::new(key::SPACE).with_shift()),
        "esc" | "escape" => Command::Key(KeyEvent::new(key::ESCAPE)),
        "z" => Command::Key(KeyEvent::new(key::Z)),
        "shift+z" => Command::Key(KeyEvent::new(key::Z).with_shift()),
        "down" => {
            let x = number(&args, 0, "x")?;
            let shift = match args.get(1) {
                None => false,
                Some(&"shift") => true,
                Some(other) => bail!("unexpected argument '{}' (expected 'shift')", other),
            };
            Command::PointerDown { x, shift }
        }
        "move" => Command::PointerMove { x: number(&args, 0, "x")? },
        "up" => Command::PointerUp { x: number(&args, 0, "x")? },
        "loop" => Command::Loop {
            start: percent(&args, 0, "start")?,
            end: percent(&args, 1, "end")?,
        },
        "alpha" => Command::Alpha(number(&args, 0, "alpha")?),
        "slider" => Command::Slider(percent(&args, 0, "position")?),
        "open" => {
            // Paths may contain spaces
            let path = args.join(" ");
            if path.is_empty() {
                bail!("open needs a file path");
            }
            Command::Open(PathBuf::from(path))
        }
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(Some(command))
}

fn number(args: &[&str], index: usize, name: &str) -> Result<f64> {
    let raw = args
        .get(index)
        .with_context(|| format!("missing <{}>", name))?;
    let value: f64 = raw
        .parse()
        .with_context(|| format!("<{}> must be a number, got '{}'", name, raw))?;
    if !value.is_finite() {
        bail!("<{}> must be finite", name);
    }
    Ok(value)
}

fn percent(args: &[&str], index: usize, name: &str) -> Result<f64> {
    let value = number(args, index, name)?;
    if !(0.0..=1.0).contains(&value) {
        bail!("<{}> must be between 0 and 1, got {}", name, value);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   \t").unwrap(), None);
    }

    #[test]
    fn test_keys() {
        assert_eq!(parse("space"), Command::Key(KeyEvent::new(key::SPACE)));
        assert_eq!(
            parse("shift+space"),
            Command::Key(KeyEvent::new(key::SPACE).with_shift())
        );
        assert_eq!(parse("esc"), Command::Key(KeyEvent::new(key::ESCAPE)));
        assert_eq!(parse("Z"), Command::Key(KeyEvent::new(key::Z)));
        assert_eq!(parse("shift+z"), Command::Key(KeyEvent::new(key::Z).with_shift()));
    }

    #[test]
    fn test_pointer_commands() {
        assert_eq!(parse("down 250"), Command::PointerDown { x: 250.0, shift: false });
        assert_eq!(parse("down 12.5 shift"), Command::PointerDown { x: 12.5, shift: true });
        assert_eq!(parse("move 300"), Command::PointerMove { x: 300.0 });
        assert_eq!(parse("up 400"), Command::PointerUp { x: 400.0 });
        assert!(parse_command("down").is_err());
        assert!(parse_command("down abc").is_err());
        assert!(parse_command("down 10 ctrl").is_err());
        assert!(parse_command("move NaN").is_err());
    }

    #[test]
    fn test_loop_and_alpha() {
        assert_eq!(parse("loop 0.2 0.4"), Command::Loop { start: 0.2, end: 0.4 });
        assert!(parse_command("loop 0.2").is_err());
        assert!(parse_command("loop 0.2 1.5").is_err());
        assert_eq!(parse("alpha 2"), Command::Alpha(2.0));
        assert_eq!(parse("slider 0.5"), Command::Slider(0.5));
        assert!(parse_command("slider -0.1").is_err());
    }

    #[test]
    fn test_open_keeps_spaces() {
        assert_eq!(
            parse("open my loops/drum break.wav"),
            Command::Open(PathBuf::from("my loops/drum break.wav"))
        );
        assert!(parse_command("open").is_err());
    }

    #[test]
    fn test_misc() {
        assert_eq!(parse("status"), Command::Status);
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(parse("quit"), Command::Quit);
        assert_eq!(parse("q"), Command::Quit);
        assert!(parse_command("jump").is_err());
    }
}
