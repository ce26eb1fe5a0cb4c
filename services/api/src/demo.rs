use crate::infra::{build_fund, FundStack};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use welfare_fund::categories::{CategoryId, ClaimPayload, EmergencyClaim, OutpatientClaim};
use welfare_fund::config::FundConfig;
use welfare_fund::error::AppError;
use welfare_fund::ledger::{write_statement, HistoryFilter};
use welfare_fund::money::Amount;
use welfare_fund::review::{
    Actor, Application, ApplicationId, ApplicationSubmission, Decision, ReviewError,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Opening balance of the demo fund, in ringgit (e.g. 1000.00).
    #[arg(long, value_parser = crate::infra::parse_amount, default_value = "1000.00")]
    pub(crate) opening_balance: Amount,
    /// Visit date used for the outpatient claim (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) visit_date: Option<NaiveDate>,
    /// Skip the insufficient-funds scenario.
    #[arg(long)]
    pub(crate) skip_shortfall: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Write the statement to this file instead of stdout.
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
    /// Opening balance of the demo fund whose ledger is exported.
    #[arg(long, value_parser = crate::infra::parse_amount, default_value = "1000.00")]
    pub(crate) opening_balance: Amount,
    /// Only export transactions linked to this application.
    #[arg(long)]
    pub(crate) application: Option<String>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let visit_date = args.visit_date.unwrap_or_else(|| Local::now().date_naive());
    let fund = demo_fund(args.opening_balance)?;

    println!("Student welfare fund demo");
    println!(
        "  Opening balance: RM {}",
        fund.service.ledger().current_balance()?
    );

    println!("\nOutpatient claim (admin-only route)");
    let outpatient = fund
        .service
        .submit(outpatient_submission("A22EC0042", visit_date, Amount::from_sen(3_000)))?;
    print_application(&outpatient);
    let approved = fund.service.decide(
        &outpatient.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        None,
        Some("clinic receipt verified".to_string()),
    )?;
    print_application(&approved);

    println!("\nEmergency claim (committee route)");
    let emergency = fund
        .service
        .submit(emergency_submission("A22EC0107", Amount::from_sen(15_000)))?;
    print_application(&emergency);
    let routed = fund.service.decide(
        &emergency.id,
        &Actor::committee("jkk-hep"),
        Decision::Approve,
        Some(Amount::from_sen(10_000)),
        Some("partial support recommended".to_string()),
    )?;
    print_application(&routed);
    match fund.service.decide(
        &emergency.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        Some(Amount::from_sen(15_000)),
        None,
    ) {
        Err(err @ ReviewError::AmountExceedsLimit { .. }) => {
            println!("  Admin override refused: {}", err)
        }
        Err(err) => return Err(err.into()),
        Ok(application) => print_application(&application),
    }
    let approved = fund.service.decide(
        &emergency.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        Some(Amount::from_sen(10_000)),
        None,
    )?;
    print_application(&approved);

    if !args.skip_shortfall {
        run_shortfall()?;
    }

    println!("\nLedger");
    for transaction in fund.service.ledger().history(HistoryFilter::default()).iter() {
        let transaction = transaction?;
        println!(
            "  {} {:<7} RM {:>10} -> RM {:>10}  {}",
            transaction.id,
            transaction.kind.label(),
            transaction.amount.to_string(),
            transaction.balance_after.to_string(),
            transaction
                .linked_application_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| transaction.category.to_string()),
        );
    }
    println!(
        "  Closing balance: RM {}",
        fund.service.ledger().current_balance()?
    );

    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let fund = demo_fund(args.opening_balance)?;
    seed_demo_decisions(&fund)?;

    let filter = HistoryFilter {
        application: args.application.map(ApplicationId::new),
        ..HistoryFilter::default()
    };
    let history = fund.service.ledger().history(filter);

    let rows = match args.output.as_ref() {
        Some(path) => write_statement(history.iter(), File::create(path)?)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let rows = write_statement(history.iter(), &mut handle)?;
            handle.flush()?;
            rows
        }
    };

    if let Some(path) = args.output {
        println!("Wrote {} ledger rows to {}", rows, path.display());
    }
    Ok(())
}

/// A smaller fund that cannot cover the approved amount.
fn run_shortfall() -> Result<(), AppError> {
    println!("\nShortfall check (fund of RM 50.00)");
    let fund = demo_fund(Amount::from_sen(5_000))?;
    let application = fund
        .service
        .submit(emergency_submission("A22EC0311", Amount::from_sen(8_000)))?;
    fund.service.decide(
        &application.id,
        &Actor::committee("jkk-hep"),
        Decision::Approve,
        None,
        None,
    )?;

    match fund.service.decide(
        &application.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        Some(Amount::from_sen(8_000)),
        None,
    ) {
        Err(err @ ReviewError::InsufficientFunds { .. }) => {
            println!("  Approval refused: {}", err);
            let unchanged = fund.service.application(&application.id)?;
            println!("  Status left at {}", unchanged.status);
            Ok(())
        }
        Err(err) => Err(err.into()),
        Ok(application) => {
            print_application(&application);
            Ok(())
        }
    }
}

fn demo_fund(opening_balance: Amount) -> Result<FundStack, AppError> {
    build_fund(&FundConfig {
        opening_balance: Some(opening_balance),
        category_file: None,
    })
}

/// Approve one claim on each route so the exported statement has outflows in it.
fn seed_demo_decisions(fund: &FundStack) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let outpatient = fund
        .service
        .submit(outpatient_submission("A22EC0042", today, Amount::from_sen(3_000)))?;
    fund.service.decide(
        &outpatient.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        None,
        None,
    )?;

    let emergency = fund
        .service
        .submit(emergency_submission("A22EC0107", Amount::from_sen(15_000)))?;
    fund.service.decide(
        &emergency.id,
        &Actor::committee("jkk-hep"),
        Decision::Approve,
        Some(Amount::from_sen(10_000)),
        None,
    )?;
    fund.service.decide(
        &emergency.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        Some(Amount::from_sen(10_000)),
        None,
    )?;
    Ok(())
}

fn outpatient_submission(
    student_id: &str,
    visit_date: NaiveDate,
    amount: Amount,
) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: student_id.to_string(),
        category_id: CategoryId::new("CAT-ILLNESS-OUTPATIENT"),
        payload: ClaimPayload::Outpatient(OutpatientClaim {
            clinic_name: "Pusat Kesihatan Universiti".to_string(),
            visit_date,
            total_amount: amount,
        }),
    }
}

fn emergency_submission(student_id: &str, amount: Amount) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: student_id.to_string(),
        category_id: CategoryId::new("CAT-EMERGENCY-OTHERS"),
        payload: ClaimPayload::Emergency(EmergencyClaim {
            description: "belongings lost in hostel flood".to_string(),
            amount,
        }),
    }
}

fn print_application(application: &Application) {
    let approved = application
        .approved_amount
        .map(|amount| format!("RM {}", amount))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {} [{}] requested RM {} approved {}",
        application.id, application.status, application.requested_amount, approved
    );
}
