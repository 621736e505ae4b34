use campus_core::resource::Resource;
use campus_core::screen::{ListView, ResourceListScreen};
use std::io::{self, BufRead, Write};

/// Plain-text table sized to the widest cell of each column.
pub fn print_table<S: AsRef<str>>(columns: &[S], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.as_ref().chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(columns.iter().map(|c| c.as_ref()).collect()));
    println!("{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in rows {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
}

pub fn print_pairs(pairs: &[(String, String)]) {
    let width = pairs.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    for (key, value) in pairs {
        println!("{:<width$}  {}", key, value, width = width);
    }
}

/// Draws whatever state the list screen is in. A failed load is an error.
pub fn print_list<R: Resource>(screen: &ResourceListScreen<R>) -> anyhow::Result<()> {
    match screen.view() {
        ListView::Loading => println!("⏳ Loading..."),
        ListView::Failed(message) => anyhow::bail!("{}", message),
        ListView::NoMatches => println!("No matches."),
        ListView::Rows(rows) => {
            let cells: Vec<Vec<String>> = rows.into_iter().map(|r| screen.row_cells(r)).collect();
            print_table(screen.columns(), &cells);
            println!("\n{} row(s)", cells.len());
        }
    }
    Ok(())
}

/// Yes/no prompt on stdin; `--yes` answers for the user.
pub struct StdinConfirm {
    pub assume_yes: bool,
}

impl campus_core::screen::Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
