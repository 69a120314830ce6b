//! Selection controls.
//!
//! A [`SelectControl`] is the viewer's stand-in for a dropdown: an ordered list of
//! option names plus the currently selected one. The viewer drives it from the
//! keyboard and shows the selection in the window title.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectControl {
    options: Vec<String>,
    selected: Option<usize>,
}

impl SelectControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every option and clears the selection.
    pub fn replace_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self.selected = None;
    }

    /// Appends `name` unless it is already an option. Returns whether it was added.
    pub fn push_option(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.options.contains(&name) {
            return false;
        }
        self.options.push(name);
        true
    }

    /// Selects `name`. Unknown names leave the selection unchanged.
    pub fn select(&mut self, name: &str) -> bool {
        match self.options.iter().position(|option| option == name) {
            Some(idx) => {
                self.selected = Some(idx);
                true
            }
            None => false,
        }
    }

    /// Moves to the next option, wrapping around. Starts at the first option
    /// when nothing is selected yet.
    pub fn select_next(&mut self) -> Option<&str> {
        if self.options.is_empty() {
            return None;
        }
        let next = match self.selected {
            Some(idx) => (idx + 1) % self.options.len(),
            None => 0,
        };
        self.selected = Some(next);
        self.selected()
    }

    /// Moves to the previous option, wrapping around. Starts at the last option
    /// when nothing is selected yet.
    pub fn select_previous(&mut self) -> Option<&str> {
        if self.options.is_empty() {
            return None;
        }
        let len = self.options.len();
        let previous = match self.selected {
            Some(idx) => (idx + len - 1) % len,
            None => len - 1,
        };
        self.selected = Some(previous);
        self.selected()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacing_options_clears_selection() {
        let mut control = SelectControl::new();
        control.replace_options(["Body", "Trim"]);
        assert!(control.select("Trim"));
        control.replace_options(["Wheels"]);
        assert_eq!(control.selected(), None);
        assert_eq!(control.options(), ["Wheels"]);
    }

    #[test]
    fn unknown_name_keeps_selection() {
        let mut control = SelectControl::new();
        control.replace_options(["Body"]);
        control.select("Body");
        assert!(!control.select("Roof"));
        assert_eq!(control.selected(), Some("Body"));
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let mut control = SelectControl::new();
        assert_eq!(control.select_next(), None);
        control.replace_options(["a", "b", "c"]);
        assert_eq!(control.select_previous(), Some("c"));
        assert_eq!(control.select_next(), Some("a"));
        assert_eq!(control.select_next(), Some("b"));
        assert_eq!(control.select_previous(), Some("a"));
        assert_eq!(control.select_previous(), Some("c"));
    }

    #[test]
    fn push_option_skips_duplicates() {
        let mut control = SelectControl::new();
        assert!(control.push_option("misterio03"));
        assert!(!control.push_option("misterio03"));
        assert_eq!(control.options().len(), 1);
    }
}
