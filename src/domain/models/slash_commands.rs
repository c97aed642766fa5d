#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .trim()
            .split(' ')
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        let prefix = args[0].to_string();
        args.remove(0);
        args.retain(|e| return !e.is_empty());

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_new_session()
            || cmd.is_temp_session()
            || cmd.is_session_list()
            || cmd.is_select_session()
            || cmd.is_rename_session()
            || cmd.is_delete_session()
            || cmd.is_edit()
            || cmd.is_retry()
            || cmd.is_regenerate()
            || cmd.is_stop()
            || cmd.is_attach()
            || cmd.is_history()
            || cmd.is_export()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Arguments after the first `skip` joined back into free text.
    pub fn rest(&self, skip: usize) -> String {
        return self
            .args
            .iter()
            .skip(skip)
            .map(|e| return e.as_str())
            .collect::<Vec<&str>>()
            .join(" ");
    }

    /// First argument as a 1-based position converted to a log index.
    pub fn index_arg(&self) -> Option<usize> {
        let position = self.args.first()?.parse::<usize>().ok()?;
        return position.checked_sub(1);
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_new_session(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_temp_session(&self) -> bool {
        return ["/t", "/temp"].contains(&self.command.as_str());
    }

    pub fn is_session_list(&self) -> bool {
        return ["/s", "/sessions"].contains(&self.command.as_str());
    }

    pub fn is_select_session(&self) -> bool {
        return ["/o", "/open", "/select"].contains(&self.command.as_str()) && !self.args.is_empty();
    }

    pub fn is_rename_session(&self) -> bool {
        return ["/rename"].contains(&self.command.as_str()) && !self.args.is_empty();
    }

    pub fn is_delete_session(&self) -> bool {
        return ["/d", "/delete"].contains(&self.command.as_str());
    }

    pub fn is_edit(&self) -> bool {
        return ["/e", "/edit"].contains(&self.command.as_str()) && self.args.len() >= 2;
    }

    pub fn is_retry(&self) -> bool {
        return ["/r", "/retry"].contains(&self.command.as_str()) && !self.args.is_empty();
    }

    pub fn is_regenerate(&self) -> bool {
        return ["/regen", "/regenerate"].contains(&self.command.as_str());
    }

    pub fn is_stop(&self) -> bool {
        return ["/stop"].contains(&self.command.as_str());
    }

    pub fn is_attach(&self) -> bool {
        return ["/a", "/attach"].contains(&self.command.as_str()) && !self.args.is_empty();
    }

    pub fn is_history(&self) -> bool {
        return ["/history"].contains(&self.command.as_str());
    }

    pub fn is_export(&self) -> bool {
        return ["/x", "/export"].contains(&self.command.as_str());
    }
}
