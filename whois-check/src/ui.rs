//! Terminal output for lookup results.
//!
//! Result lines are padded to a common domain column so mixed outputs stay
//! aligned; colour is dropped automatically when stdout is not a terminal.

use console::{pad_str, style, Alignment};
use whois_check_lib::{AgeResult, RouteEntry, WhoisError};

/// Width of the domain column, clamped so one long name doesn't push everything.
pub fn domain_column_width(domains: &[String]) -> usize {
    domains
        .iter()
        .map(|d| d.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(12, 48)
}

/// Section header printed before raw WHOIS text when several domains are queried.
pub fn print_domain_header(domain: &str) {
    println!(
        "{} {} {}",
        style("──").dim(),
        style(domain).cyan().bold(),
        style("─".repeat(40usize.saturating_sub(domain.chars().count()))).dim()
    );
}

pub fn print_availability(domain: &str, result: &Result<bool, WhoisError>, width: usize) {
    let padded = pad_str(domain, width, Alignment::Left, None);

    match result {
        Ok(true) => println!(
            "{}  {}",
            style(&padded).white(),
            style("AVAILABLE").green().bold()
        ),
        Ok(false) => println!("{}  {}", style(&padded).white(), style("TAKEN").red().bold()),
        Err(e) => println!(
            "{}  {}  {}",
            style(&padded).white(),
            style("ERROR").yellow(),
            style(e.user_message()).dim()
        ),
    }
}

pub fn print_age(domain: &str, result: &Result<AgeResult, WhoisError>, width: usize) {
    let padded = pad_str(domain, width, Alignment::Left, None);

    match result {
        Ok(age) => println!(
            "{}  {} {}  {}",
            style(&padded).white(),
            style("created").dim(),
            age.creation_date,
            style(age.to_string()).bold()
        ),
        Err(e) => println!(
            "{}  {}  {}",
            style(&padded).white(),
            style("ERROR").yellow(),
            style(e.user_message()).dim()
        ),
    }
}

/// One row per routed TLD: chain, server and not-found rule.
pub fn print_routes(routes: &[(String, RouteEntry)]) {
    let width = routes
        .iter()
        .map(|(tld, _)| tld.len())
        .max()
        .unwrap_or(0)
        .max(4);

    for (tld, route) in routes {
        let server = if route.server.is_empty() {
            style("(none)".to_string()).yellow()
        } else {
            style(route.server.clone()).white()
        };

        println!(
            "{}  {}  {}",
            style(pad_str(tld, width, Alignment::Left, None)).green(),
            server,
            style(&route.not_found).dim()
        );
    }

    println!();
    println!("{} TLDs routed", style(routes.len()).bold());
}
