//! Console commands

use todo_core::task::Category;

pub const HELP: &str = "\
Commands:
  login               sign in
  logout              sign out
  add <text>          add a task
  toggle <n>          mark task n done / not done
  cat <n> <category>  set task n's category (Work, Personal, Urgent, Finance, Learning, General)
  rm <n>              delete task n
  clear               dismiss the status message
  list                show the list again
  help                show this help
  quit                exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Logout,
    Add(String),
    /// Task positions are zero-based; users type them one-based
    Toggle(usize),
    Category(usize, Category),
    Remove(usize),
    Clear,
    List,
    Help,
    Quit,
}

fn position(raw: Option<&str>) -> Result<usize, String> {
    let raw = raw.ok_or_else(|| "missing task number".to_string())?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("not a task number: {}", raw)),
    }
}

/// Category names typed at the console, in any case
fn category(label: &str) -> Result<Category, String> {
    Category::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(label))
        .ok_or_else(|| format!("unknown category: {}", label))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        match verb.to_ascii_lowercase().as_str() {
            "login" => Ok(Self::Login),
            "logout" => Ok(Self::Logout),
            "add" if rest.is_empty() => Err("add needs some text".to_string()),
            "add" => Ok(Self::Add(rest.to_string())),
            "toggle" => Ok(Self::Toggle(position(args.next())?)),
            "cat" => {
                let index = position(args.next())?;
                let label = args.next().ok_or_else(|| "missing category".to_string())?;
                Ok(Self::Category(index, category(label)?))
            }
            "rm" => Ok(Self::Remove(position(args.next())?)),
            "clear" => Ok(Self::Clear),
            "list" | "" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command: {} (try help)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("login"), Ok(Command::Login));
        assert_eq!(
            Command::parse("add  Call the bank  "),
            Ok(Command::Add("Call the bank".to_string()))
        );
        assert_eq!(Command::parse("toggle 1"), Ok(Command::Toggle(0)));
        assert_eq!(
            Command::parse("cat 3 finance"),
            Ok(Command::Category(2, Category::Finance))
        );
        assert_eq!(
            Command::parse("cat 1 LEARNING"),
            Ok(Command::Category(0, Category::Learning))
        );
        assert_eq!(Command::parse("RM 2"), Ok(Command::Remove(1)));
        assert_eq!(Command::parse(""), Ok(Command::List));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Command::parse("add").is_err());
        assert!(Command::parse("toggle").is_err());
        assert!(Command::parse("toggle 0").is_err());
        assert!(Command::parse("rm two").is_err());
        assert!(Command::parse("cat 1 Chores").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
