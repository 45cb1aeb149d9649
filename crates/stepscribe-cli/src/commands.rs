//! Command loop grammar.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New { title: String },
    Start,
    Pause,
    Resume,
    Stop,
    Status,
    Capture,
    Keys,
    Monitors,
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  new <title>   create a tutorial and session
  start         start recording
  pause         pause recording
  resume        resume recording
  stop          stop and synthesize steps
  status        show session status
  capture       manual capture at the pointer
  keys          toggle keystroke suppression
  monitors      list monitors
  list          list saved tutorials
  help          show this help
  quit          exit";

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "new" => {
            if rest.is_empty() {
                return Err("usage: new <title>".into());
            }
            Command::New {
                title: rest.to_string(),
            }
        }
        "start" => Command::Start,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "capture" => Command::Capture,
        "keys" => Command::Keys,
        "monitors" => Command::Monitors,
        "list" => Command::List,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_new_keeps_title_spacing() {
        assert_eq!(
            parse("new   Export a  report ").unwrap(),
            Some(Command::New {
                title: "Export a  report".into()
            })
        );
        assert!(parse("new").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("START").unwrap(), Some(Command::Start));
        assert_eq!(parse(" keys ").unwrap(), Some(Command::Keys));
        assert_eq!(parse("exit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_unknown() {
        let err = parse("record").unwrap_err();
        assert!(err.contains("record"));
    }
}
