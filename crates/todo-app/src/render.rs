//! Plain-text rendering of a [`View`]

use std::fmt;

use todo_core::task::Task;

use crate::session::View;

const TITLE: &str = "Intelligent To-Do";

fn task_line(index: usize, task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    // A trailing star marks a category the user picked by hand
    let corrected = if task.is_user_corrected { "*" } else { "" };
    format!(
        "{:>3}. [{}] {}  ({}{})",
        index + 1,
        mark,
        task.text,
        task.category,
        corrected
    )
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Loading => writeln!(f, "Loading..."),
            View::SignedOut { error } => {
                writeln!(f, "{}", TITLE)?;
                writeln!(f, "{}", "-".repeat(TITLE.len()))?;
                if let Some(error) = error {
                    writeln!(f, "! {}", error)?;
                }
                writeln!(f, "Welcome!")?;
                writeln!(
                    f,
                    "Please sign in with your GitHub account to manage your to-do list."
                )
            }
            View::SignedIn { user, tasks, error } => {
                let header = format!("{} | {}", TITLE, user.label());
                writeln!(f, "{}", header)?;
                writeln!(f, "{}", "-".repeat(header.chars().count()))?;
                if let Some(error) = error {
                    writeln!(f, "! {}", error)?;
                }
                if tasks.is_empty() {
                    return writeln!(f, "No tasks yet.");
                }
                for (index, task) in tasks.iter().enumerate() {
                    writeln!(f, "{}", task_line(index, task))?;
                }
                Ok(())
            }
        }
    }
}
