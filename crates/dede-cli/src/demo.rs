//! Seeded demo: one renewal request walked through the full approval
//! path, with the flow log and progress printed at each step.

use std::sync::Arc;

use clap::Args;
use dede_core::{Role, Timestamp, UserId};
use dede_engine::{
    Engine, InMemoryRoleDirectory, LicensePayload, LicenseRequest, TransitionCommand,
};
use dede_workflow::RequestStatus;

/// Arguments for the demo walkthrough.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Stop after this status instead of walking to approval.
    #[arg(long)]
    pub stop_at: Option<String>,
}

/// The cast of a seeded demo engine.
pub struct Seed {
    pub engine: Engine,
    pub owner: UserId,
    pub admin: UserId,
    pub head: UserId,
    pub inspector: UserId,
    pub consultant: UserId,
    pub request: LicenseRequest,
}

/// Build an engine with one user per role and a draft renewal request.
pub fn seed() -> Seed {
    let directory = Arc::new(InMemoryRoleDirectory::new());
    let owner = UserId::new();
    let admin = UserId::new();
    let head = UserId::new();
    let inspector = UserId::new();
    let consultant = UserId::new();
    directory.grant(owner, Role::User);
    directory.grant(admin, Role::Admin);
    directory.grant(head, Role::DedeHead);
    directory.grant(inspector, Role::DedeStaff);
    directory.grant(consultant, Role::DedeConsult);

    let engine = Engine::new(directory);
    let request = LicenseRequest::draft(
        owner,
        LicensePayload::Renewal {
            license_no: "DEDE-2021-0553".into(),
            expires_at: Timestamp::now().plus_days(90),
        },
    );
    engine.requests().insert(request.clone());

    Seed {
        engine,
        owner,
        admin,
        head,
        inspector,
        consultant,
        request,
    }
}

/// Walk the seeded request along the canonical happy path.
pub fn run(args: &DemoArgs) -> anyhow::Result<()> {
    let seed = seed();
    let engine = &seed.engine;
    let table = engine.table();

    let steps: [(RequestStatus, UserId, Role); 10] = [
        (RequestStatus::NewRequest, seed.owner, Role::User),
        (RequestStatus::Accepted, seed.admin, Role::Admin),
        (RequestStatus::Forwarded, seed.admin, Role::Admin),
        (RequestStatus::Assigned, seed.head, Role::DedeHead),
        (RequestStatus::Appointment, seed.inspector, Role::DedeStaff),
        (RequestStatus::Inspecting, seed.inspector, Role::DedeStaff),
        (RequestStatus::InspectionDone, seed.inspector, Role::DedeStaff),
        (RequestStatus::DocumentEdit, seed.consultant, Role::DedeConsult),
        (RequestStatus::ReportApproved, seed.consultant, Role::DedeConsult),
        (RequestStatus::Approved, seed.head, Role::DedeHead),
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
            format!("demo: {to}"),
        );
        if to == RequestStatus::Assigned {
            cmd = cmd.with_inspector(seed.inspector);
        }
        if to == RequestStatus::Appointment {
            cmd = cmd.with_appointment(Timestamp::now().plus_days(5));
        }
        current = engine.transitions().apply_transition(cmd)?;
        println!(
            "{:>16}  progress {:>3}%  deadline {}",
            current.status.to_string(),
            table.progress(current.status),
            current
                .deadline
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
        );
        if args.stop_at.as_deref() == Some(current.status.as_str()) {
            break;
        }
    }

    println!("\nflow log:");
    for entry in engine.flow_log().entries_for(current.id) {
        println!(
            "  {}  {} -> {}  by {}",
            entry.created_at,
            entry
                .previous_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
            entry.new_status,
            entry.changed_by,
        );
    }

    println!("\nunread notifications:");
    for (label, user) in [
        ("owner", seed.owner),
        ("admin", seed.admin),
        ("head", seed.head),
        ("inspector", seed.inspector),
        ("consultant", seed.consultant),
    ] {
        println!(
            "  {label:>10}: {}",
            engine.notifications().unread_count(user)
        );
    }
    Ok(())
}
