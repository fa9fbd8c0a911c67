//! Terminal rendering for slots, confirmations, appointment lists and errors.

use chrono::NaiveDate;
use citas_api::wire::VerificationResponse;
use citas_booking::{AppointmentRow, Resolution, SlotSource};
use citas_core::error_code::Tone;
use citas_core::{AppointmentConfirmation, CancellationPolicy, Catalogs, ErrorDescriptor};

const KEY_WIDTH: usize = 16;

// ── Public API ──

pub fn print_slots(date: NaiveDate, branch_id: i64, resolution: &Resolution) {
    println!("=== Branch {branch_id}, {date} ===");
    if let Some(error) = &resolution.error {
        print_error(error);
    }
    match resolution.source {
        SlotSource::Primary => {}
        SlotSource::Fallback => eprintln!("  (estimated from configured slots)"),
        SlotSource::FallbackUnfiltered => {
            eprintln!("  (configured slots; occupancy unknown)")
        }
        SlotSource::Unavailable => {
            println!("  availability could not be determined");
            return;
        }
    }
    if resolution.slots.is_empty() {
        println!("  no times available");
        return;
    }
    let times: Vec<String> = resolution.slots.iter().map(|t| t.to_string()).collect();
    println!("  {}", times.join("  "));
}

/// Print a confirmation as a vertical card.
pub fn print_confirmation(confirmation: &AppointmentConfirmation, catalogs: &Catalogs) {
    let booking = &confirmation.booking;
    println!("=== Appointment {} ===", confirmation.ticket_number);
    if let Some(message) = &confirmation.message {
        println!("{message}");
    }
    println!();

    let branch = catalogs
        .branch(booking.branch_id)
        .map(|b| b.name.clone())
        .unwrap_or_else(|| booking.branch_id.to_string());
    let reason = catalogs
        .reason(booking.reason_id)
        .map(|r| r.name.clone())
        .unwrap_or_else(|| booking.reason_id.to_string());

    field("client", booking.identity.reference());
    field("reason", &reason);
    field("branch", &branch);
    field("date", &booking.date.format("%Y-%m-%d").to_string());
    field("time", &booking.time.to_string());
    if let Some(obs) = &booking.observations {
        field("observations", obs);
    }
    if let Some(status) = &confirmation.status {
        field("status", status);
    }
    field(
        "issued",
        &confirmation.issued_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    if let Some(artifact) = &confirmation.artifact {
        field("verify at", &artifact.payload);
    }
}

pub fn print_appointments(client: &str, rows: &[AppointmentRow], policy: CancellationPolicy) {
    println!("=== Appointments for {client} ===");
    if rows.is_empty() {
        println!("  none");
        return;
    }
    for row in rows {
        let a = &row.appointment;
        let when = row
            .scheduled_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| a.appointment_date.clone());
        let flag = if row.cancellable { "cancellable" } else { "" };
        println!(
            "  {:>6}  {:<16} {:<14} {:<20} {:<12} {}",
            a.id,
            when,
            a.appointment_number.as_deref().unwrap_or("-"),
            a.branch_name.as_deref().unwrap_or("-"),
            a.status,
            flag
        );
    }
    println!();
    println!(
        "Cancellations need at least {} hours notice.",
        policy.lead_time_hours()
    );
}

pub fn print_verification(resp: &VerificationResponse) {
    let verdict = if resp.is_valid { "VALID" } else { "NOT VALID" };
    println!("=== {verdict} ===");
    let rows = [
        ("appointment", &resp.appointment_number),
        ("date", &resp.appointment_date),
        ("time", &resp.appointment_time),
        ("status", &resp.status),
        ("client", &resp.client_number),
        ("name", &resp.client_name),
        ("branch", &resp.branch_name),
        ("reason", &resp.appointment_type_name),
        ("message", &resp.message),
    ];
    for (key, value) in rows {
        if let Some(v) = value {
            field(key, v);
        }
    }
}

/// Print an interpreted server error with its hint, if any.
pub fn print_error(error: &ErrorDescriptor) {
    let p = error.presentation();
    let label = match p.tone {
        Tone::Warning => "warning",
        Tone::Error => "error",
    };
    match p.icon {
        Some(icon) => eprintln!("{label} [{icon}]: {}", error.message),
        None => eprintln!("{label}: {}", error.message),
    }
    if let Some(hint) = p.hint {
        eprintln!("  {hint}");
    }
}

fn field(key: &str, value: &str) {
    println!("  {key:<KEY_WIDTH$} {value}");
}
