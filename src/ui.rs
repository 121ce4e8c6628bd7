use colored::*;

use crate::{
    models::{
        issue::{Issue, IssueDetail},
        ticket::Status,
    },
    screens::{
        Notifier,
        details::{DetailPhase, DetailsScreen},
        home::{self, HomeBody, HomeScreen},
    },
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the status glyph for a ticket
pub fn get_status_glyph(status: Status) -> ColoredString {
    match status {
        Status::Open => "○".yellow(),
        Status::Closed => "✓".green(),
    }
}

fn colored_label(status: Status) -> ColoredString {
    let label = status.label().to_uppercase();
    match status {
        Status::Open => label.yellow(),
        Status::Closed => label.green(),
    }
}

/// Prints alerts to stderr
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, title: &str, message: &str) {
        eprintln!("{} {}", format!("{}:", title).bold(), message);
    }
}

/// Render the list screen: header with count, filter chips, then the body
pub fn render_home(screen: &HomeScreen) {
    println!(
        "\n  {} ({})\n",
        home::TITLE.cyan().bold(),
        screen.count()
    );

    let chips: Vec<String> = screen
        .filters()
        .iter()
        .map(|chip| {
            if chip.is_active {
                format!("[{}]", colored_label(chip.status))
            } else {
                format!(" {} ", chip.title.to_uppercase().dimmed())
            }
        })
        .collect();
    println!("  {}\n", chips.join("  "));

    match screen.body() {
        HomeBody::Loading => println!("  {}", "Loading...".dimmed()),
        HomeBody::Empty(message) => println!("  {}", message.dimmed()),
        HomeBody::Issues(issues) => {
            for issue in &issues {
                render_issue_line(issue);
            }
        }
    }
    println!();
}

/// Render one ticket: glyph, patrimony and right-aligned creation time,
/// then the description underneath
pub fn render_issue_line(issue: &Issue) {
    let terminal_width = get_terminal_width();

    let left_section = format!(
        "  {}  Patrimony {}",
        get_status_glyph(issue.status),
        issue.patrimony
    );
    let left_visible_len = format!("  {}  Patrimony {}", " ", issue.patrimony)
        .chars()
        .count();
    let right_visible_len = issue.when.chars().count();
    let total_content = left_visible_len + right_visible_len;

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!(
            "{}{}{}",
            left_section.bold(),
            " ".repeat(padding),
            issue.when.dimmed()
        );
    } else {
        // Not enough space for right alignment, just print normally
        println!("{}  {}", left_section.bold(), issue.when.dimmed());
    }

    println!("     {}", issue.description.dimmed());
    println!("     {}", issue.id.dimmed());
    println!();
}

/// Render a section header (e.g., "Equipment", "Solution")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Render the details screen for whatever phase it is in
pub fn render_details(screen: &DetailsScreen) {
    match screen.phase() {
        DetailPhase::Loading => println!("  {}", "Loading...".dimmed()),
        DetailPhase::NotFound => {
            println!("\n  {}\n", "Ticket not found".red().bold());
        }
        DetailPhase::Failed => {
            println!("\n  {}\n", "Ticket could not be loaded".red().bold());
        }
        DetailPhase::Viewing(issue) => render_issue_detail(issue),
    }
}

fn render_issue_detail(issue: &IssueDetail) {
    println!(
        "\n  {} {}",
        get_status_glyph(issue.status),
        colored_label(issue.status)
    );

    render_section_header("Equipment");
    println!("  Patrimony {}", issue.patrimony);

    render_section_header("Problem description");
    println!("  {}", issue.description);
    println!("  {}", format!("Registered on {}", issue.when).dimmed());

    render_section_header("Solution");
    match (&issue.solution, &issue.closing_date) {
        (Some(solution), Some(closing_date)) => {
            println!("  {}", solution);
            println!("  {}", format!("Closed on {}", closing_date).dimmed());
        }
        _ => println!(
            "  {}",
            format!("Close it with: issuedesk close {} --solution <text>", issue.id).dimmed()
        ),
    }
    println!();
}
