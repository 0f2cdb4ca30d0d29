use std::fmt::{self, Debug, Display};

/// One line of a [`StateDiff`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    Unchanged(String),
    Added(String),
    Removed(String),
}

/// A line diff between the pretty `Debug` renderings of two states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub lines: Vec<DiffLine>,
}

impl StateDiff {
    pub fn has_changes(&self) -> bool {
        self.lines
            .iter()
            .any(|line| !matches!(line, DiffLine::Unchanged(_)))
    }

    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            DiffLine::Added(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            DiffLine::Removed(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Display for StateDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                DiffLine::Unchanged(text) => writeln!(f, " {}", text)?,
                DiffLine::Added(text) => writeln!(f, "+{}", text)?,
                DiffLine::Removed(text) => writeln!(f, "-{}", text)?,
            }
        }
        Ok(())
    }
}

/// Diffs `{:#?}` renderings of two states, line by line.
pub fn diff_states<S: Debug>(old: &S, new: &S) -> StateDiff {
    let old = format!("{:#?}", old);
    let new = format!("{:#?}", new);
    let old: Vec<&str> = old.lines().collect();
    let new: Vec<&str> = new.lines().collect();

    // longest common subsequence table, filled from the end
    let mut table = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            lines.push(DiffLine::Unchanged(old[i].to_string()));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            lines.push(DiffLine::Removed(old[i].to_string()));
            i += 1;
        } else {
            lines.push(DiffLine::Added(new[j].to_string()));
            j += 1;
        }
    }
    lines.extend(old[i..].iter().map(|line| DiffLine::Removed(line.to_string())));
    lines.extend(new[j..].iter().map(|line| DiffLine::Added(line.to_string())));
    StateDiff { lines }
}
