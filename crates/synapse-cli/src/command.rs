/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Verify(String),
    Channels,
    Create {
        name: String,
        description: Option<String>,
    },
    Join(String),
    SignOut,
    Help,
    Quit,
    /// Anything not starting with `/` is a message for the open channel.
    Say(String),
    Unknown(String),
}

pub const HELP: &str = "\
/verify <code>                  enter the access code
/channels                       refresh the channel list
/create <name> [| description]  create a channel
/join <number|name|id>          open a channel
/signout                        sign out
/quit                           exit
anything else                   send to the open channel";

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Say(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "verify" => Self::Verify(arg.to_string()),
            "channels" | "refresh" => Self::Channels,
            "create" => {
                let (name, description) = match arg.split_once('|') {
                    Some((name, description)) => {
                        let description = description.trim();
                        (name.trim(), (!description.is_empty()).then(|| description.to_string()))
                    }
                    None => (arg, None),
                };
                Self::Create {
                    name: name.to_string(),
                    description,
                }
            }
            "join" => Self::Join(arg.to_string()),
            "signout" | "logout" => Self::SignOut,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}
