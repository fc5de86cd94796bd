use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::{
    DisputeKind, DisputePriority, Error, Money, Operation, OperationStream, Severity, Verdict,
};

/// Reads an operations journal in CSV form. One row per operation; columns
/// not used by a given operation stay empty.
pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct OpRow {
    op: String,
    user: Option<u64>,
    counterparty: Option<u64>,
    admin: Option<u64>,
    booking: Option<u64>,
    id: Option<u64>,
    amount: Option<Money>,
    verdict: Option<String>,
    kind: Option<String>,
    severity: Option<String>,
    priority: Option<String>,
    days: Option<u32>,
    text: Option<String>,
    phrase: Option<String>,
}

fn require<T>(field: Option<T>, name: &str, op: &str) -> Result<T, Error> {
    field.ok_or_else(|| Error::Ingestion(format!("{op}: missing required column '{name}'")))
}

fn parse_severity(s: &str) -> Result<Severity, Error> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        other => Err(Error::Ingestion(format!("invalid severity: {other}"))),
    }
}

fn parse_priority(s: &str) -> Result<DisputePriority, Error> {
    match s.to_ascii_lowercase().as_str() {
        "normal" => Ok(DisputePriority::Normal),
        "high" => Ok(DisputePriority::High),
        "urgent" => Ok(DisputePriority::Urgent),
        other => Err(Error::Ingestion(format!("invalid priority: {other}"))),
    }
}

fn parse_kind(s: &str) -> Result<DisputeKind, Error> {
    match s.to_ascii_lowercase().as_str() {
        "quality" => Ok(DisputeKind::Quality),
        "no_show" => Ok(DisputeKind::NoShow),
        "technical" => Ok(DisputeKind::Technical),
        "payment" => Ok(DisputeKind::Payment),
        "other" => Ok(DisputeKind::Other),
        other => Err(Error::Ingestion(format!("invalid dispute kind: {other}"))),
    }
}

fn parse_verdict(s: &str) -> Result<Verdict, Error> {
    match s.to_ascii_lowercase().as_str() {
        "refund_full" => Ok(Verdict::RefundFull),
        "refund_half" => Ok(Verdict::RefundHalf),
        "release_to_tutor" => Ok(Verdict::ReleaseToTutor),
        "free_credit" => Ok(Verdict::FreeCredit),
        "makeup" => Ok(Verdict::Makeup),
        other => Err(Error::Ingestion(format!("invalid verdict: {other}"))),
    }
}

impl TryFrom<OpRow> for Operation {
    type Error = Error;

    fn try_from(row: OpRow) -> Result<Self, Self::Error> {
        let op = row.op.trim().to_ascii_lowercase();
        let operation = match op.as_str() {
            "deposit" => Operation::Deposit {
                user: require(row.user, "user", &op)?,
                amount: require(row.amount, "amount", &op)?,
            },
            "bank" => Operation::RegisterBank {
                user: require(row.user, "user", &op)?,
                holder: require(row.text, "text", &op)?,
                masked_account: require(row.phrase, "phrase", &op)?,
            },
            "capture" => Operation::CapturePayment {
                booking: require(row.booking, "booking", &op)?,
                payer: require(row.user, "user", &op)?,
                payee: require(row.counterparty, "counterparty", &op)?,
                amount: require(row.amount, "amount", &op)?,
            },
            "file_dispute" => Operation::FileDispute {
                booking: require(row.booking, "booking", &op)?,
                plaintiff: require(row.user, "user", &op)?,
                kind: match row.kind {
                    Some(kind) => parse_kind(&kind)?,
                    None => DisputeKind::Other,
                },
                priority: match row.priority {
                    Some(priority) => parse_priority(&priority)?,
                    None => DisputePriority::Normal,
                },
                deadline_days: row.days.unwrap_or(7),
            },
            "investigate" => Operation::StartInvestigation {
                dispute: require(row.id, "id", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "resolve" => Operation::ResolveDispute {
                dispute: require(row.id, "id", &op)?,
                verdict: parse_verdict(&require(row.verdict, "verdict", &op)?)?,
                notes: require(row.text, "text", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "confirm_makeup" => Operation::ConfirmMakeup {
                dispute: require(row.id, "id", &op)?,
            },
            "warn" => Operation::IssueWarning {
                user: require(row.user, "user", &op)?,
                severity: parse_severity(&require(row.severity, "severity", &op)?)?,
                reason: require(row.text, "text", &op)?,
                admin: require(row.admin, "admin", &op)?,
                booking: row.booking,
            },
            "suspend" => Operation::Suspend {
                user: require(row.user, "user", &op)?,
                days: require(row.days, "days", &op)?,
                reason: require(row.text, "text", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "lift_suspension" => Operation::LiftSuspension {
                user: require(row.user, "user", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "block" => Operation::Block {
                user: require(row.user, "user", &op)?,
                reason: require(row.text, "text", &op)?,
                confirmation: require(row.phrase, "phrase", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "unblock" => Operation::Unblock {
                user: require(row.user, "user", &op)?,
                reason: require(row.text, "text", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "withdraw" => Operation::CreateWithdrawal {
                tutor: require(row.user, "user", &op)?,
                amount: require(row.amount, "amount", &op)?,
            },
            "approve" => Operation::ApproveWithdrawal {
                id: require(row.id, "id", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "reject" => Operation::RejectWithdrawal {
                id: require(row.id, "id", &op)?,
                reason: require(row.text, "text", &op)?,
                admin: require(row.admin, "admin", &op)?,
            },
            "cancel" => Operation::CancelWithdrawal {
                id: require(row.id, "id", &op)?,
                tutor: require(row.user, "user", &op)?,
            },
            "complete" => Operation::CompleteWithdrawal {
                id: require(row.id, "id", &op)?,
            },
            other => {
                return Err(Error::Ingestion(format!(
                    "invalid operation type: {other}"
                )));
            }
        };
        Ok(operation)
    }
}

impl<R: Read + Send + 'static> OperationStream for CsvReader<R> {
    type OpStream = Pin<Box<dyn Stream<Item = Result<Operation, Error>> + Send>>;

    fn stream(&mut self) -> Self::OpStream {
        // Take ownership of the reader so the iterator we build owns all data and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<Operation, Error>>::new()));
            }
        };

        let iter = reader.into_deserialize::<OpRow>().map(|row_res| match row_res {
            Ok(row) => Operation::try_from(row),
            Err(e) => Err(Error::Ingestion(format!(
                "CSV deserialization error: {}",
                e
            ))),
        });

        Box::pin(stream::iter(iter))
    }
}
