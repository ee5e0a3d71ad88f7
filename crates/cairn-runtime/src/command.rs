// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Line commands accepted in interactive mode.

use std::str::FromStr;

/// One interactive command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Launch a projectile at the stacks.
    Throw,
    /// Advance the given number of frames.
    Step(u32),
    /// Print the step statistics.
    Stats,
    /// Leave the loop.
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some("throw" | "t") => Command::Throw,
            Some("step" | "s") => match words.next() {
                None => Command::Step(1),
                Some(n) => Command::Step(
                    n.parse()
                        .map_err(|_| format!("'{n}' is not a frame count"))?,
                ),
            },
            Some("stats") => Command::Stats,
            Some("quit" | "q" | "exit") => Command::Quit,
            Some(other) => return Err(format!("unknown command '{other}'")),
            None => return Err("empty command".to_owned()),
        };
        if let Some(extra) = words.next() {
            return Err(format!("unexpected argument '{extra}'"));
        }
        Ok(command)
    }
}

/// Help text printed at the interactive prompt.
pub const HELP: &str = "commands: throw | step [n] | stats | quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("throw".parse(), Ok(Command::Throw));
        assert_eq!("step".parse(), Ok(Command::Step(1)));
        assert_eq!("  step 60 ".parse(), Ok(Command::Step(60)));
        assert_eq!("stats".parse(), Ok(Command::Stats));
        assert_eq!("q".parse(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
        assert!("step many".parse::<Command>().is_err());
        assert!("throw twice".parse::<Command>().is_err());
    }
}
