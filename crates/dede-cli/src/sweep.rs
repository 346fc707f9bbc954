//! Seeded one-shot sweep: builds a request stuck in `appointment` with
//! an elapsed deadline, runs one overdue sweep pass, and prints the
//! report.

use clap::Args;
use dede_core::{Role, Timestamp};
use dede_engine::{ReminderStatus, TransitionCommand};
use dede_workflow::RequestStatus;

use crate::demo;

/// Arguments for the sweep demonstration.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Backdate the appointment deadline by this many days.
    #[arg(long, default_value_t = 1)]
    pub days_overdue: i64,
}

/// Seed an overdue scenario and run one sweep pass.
pub fn run(args: &SweepArgs) -> anyhow::Result<()> {
    let seed = demo::seed();
    let engine = &seed.engine;

    // Walk to `appointment`, then backdate the deadline.
    let steps: [(RequestStatus, dede_core::UserId, Role); 5] = [
        (RequestStatus::NewRequest, seed.owner, Role::User),
        (RequestStatus::Accepted, seed.admin, Role::Admin),
        (RequestStatus::Forwarded, seed.admin, Role::Admin),
        (RequestStatus::Assigned, seed.head, Role::DedeHead),
        (RequestStatus::Appointment, seed.inspector, Role::DedeStaff),
    ];
    let mut current = seed.request;
    for (to, actor, role) in steps {
        let mut cmd = TransitionCommand::by_staff(
            current.id,
            current.license_type,
            current.status,
            to,
            actor,
            role,
            format!("sweep demo: {to}"),
        );
        if to == RequestStatus::Assigned {
            cmd = cmd.with_inspector(seed.inspector);
        }
        current = engine.transitions().apply_transition(cmd)?;
    }

    let now = Timestamp::now();
    let elapsed = now.minus_days(args.days_overdue);
    engine
        .requests()
        .try_update(current.license_type, current.id, |r| {
            r.deadline = Some(elapsed);
            Ok::<(), ()>(())
        })
        .ok_or_else(|| anyhow::anyhow!("seeded request missing"))?
        .ok();
    for reminder in engine.reminders().for_request(current.id) {
        if reminder.status == ReminderStatus::Active {
            engine
                .reminders()
                .update(reminder.id, |r| r.deadline_date = elapsed);
        }
    }

    let report = engine.deadlines().run_overdue_sweep(now);
    println!("{}", serde_json::to_string_pretty(&report)?);

    let request = engine
        .requests()
        .get(current.license_type, current.id)
        .ok_or_else(|| anyhow::anyhow!("seeded request missing"))?;
    println!(
        "request {} is now {} (owner unread: {})",
        request.id,
        request.status,
        engine.notifications().unread_count(seed.owner),
    );
    Ok(())
}
