//! Workload data generators.
//!
//! For a given identifier every generator produces the same document shape: field names, nesting
//! and array lengths are fixed, only leaf values are random. The size-classed generators are the
//! only place that knows how big each document is.

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Value};

/// Identifiers are drawn from the non-negative `int4` range so they fit every `id` column.
pub fn random_id() -> i32 {
    rand::thread_rng().gen_range(0..i32::MAX)
}

/// A block of identifiers reserved by a scenario for seed rows, disjoint from other scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRange {
    pub start: i32,
    pub count: i32,
}

impl SeedRange {
    pub const fn new(start: i32, count: i32) -> Self {
        Self { start, count }
    }

    /// The last identifier in the range, inclusive.
    pub const fn end(&self) -> i32 {
        self.start + self.count - 1
    }

    /// `(index, id)` pairs, where `index` counts from zero.
    pub fn ids(&self) -> impl Iterator<Item = (i32, i32)> {
        let start = self.start;
        (0..self.count).map(move |index| (index, start + index))
    }
}

/// Seed rows for the containment scenarios.
pub const CONTAINMENT_RANGE: SeedRange = SeedRange::new(2_000_000, 100);
/// Seed rows for the equality scenario.
pub const EQUALITY_RANGE: SeedRange = SeedRange::new(1_000_000, 100);

/// Number of distinct `string` values in the containment seed rows.
pub const CONTAINMENT_ALPHABET: i32 = 10;

pub fn standard_jsonb(id: i32) -> Value {
    json!({
        "id": id,
        "string": "hello",
        "number": 42,
        "nested": {
            "number": 1815,
            "string": "world",
        },
        "array_string": ["hello", "world"],
        "array_number": [42, 84],
    })
}

/// A seed row whose `string` field cycles through `value0` to `value9`.
pub fn containment_seed(id: i32, index: i32) -> Value {
    let bucket = index % CONTAINMENT_ALPHABET;
    json!({
        "id": id,
        "string": format!("value{bucket}"),
        "number": bucket,
        "nested": {
            "string": "world",
            "number": index,
        },
    })
}

/// A containment pattern that matches a tenth of the seed rows.
pub fn containment_pattern() -> Value {
    let bucket = rand::thread_rng().gen_range(0..CONTAINMENT_ALPHABET);
    json!({ "string": format!("value{bucket}") })
}

/// `(username, email)` for an equality seed row.
pub fn equality_seed(index: i32) -> (String, String) {
    (format!("user{index}"), format!("user{index}@example.com"))
}

/// An email that belongs to one of the seed rows in `range`.
pub fn equality_probe(range: SeedRange) -> String {
    let index = rand::thread_rng().gen_range(0..range.count);
    equality_seed(index).1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// Credit report with monthly payment history, around 80 KB
    History,
    /// Processed credit report, around 250 KB
    Extract,
    /// Raw bureau report, around 500 KB
    Full,
}

impl SizeClass {
    /// Nominal serialized size in bytes. Generated documents are within 20% of this.
    pub const fn nominal_bytes(self) -> usize {
        match self {
            SizeClass::History => 80_000,
            SizeClass::Extract => 250_000,
            SizeClass::Full => 500_000,
        }
    }

    pub fn generate(self, id: i32) -> Value {
        let mut rng = rand::thread_rng();
        match self {
            SizeClass::History => history_document(&mut rng, id),
            SizeClass::Extract => extract_document(&mut rng, id),
            SizeClass::Full => full_document(&mut rng, id),
        }
    }
}

const ACCOUNT_TYPES: [&str; 5] = ["revolving", "installment", "mortgage", "open", "collection"];
const PAYMENT_STATUSES: [&str; 6] = [
    "current",
    "late_30",
    "late_60",
    "late_90",
    "late_120",
    "charged_off",
];
const INDUSTRY_CODES: [&str; 6] = [
    "bank",
    "credit_union",
    "finance_company",
    "retail",
    "utility",
    "medical",
];
const STATES: [&str; 10] = ["CA", "TX", "NY", "FL", "IL", "PA", "OH", "GA", "NC", "MI"];
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const HISTORY_TRADELINES: usize = 50;
const HISTORY_MONTHS: usize = 24;
const EXTRACT_TRADELINES: usize = 110;
const EXTRACT_SNAPSHOTS: usize = 15;
const EXTRACT_INQUIRIES: usize = 45;
const FULL_CONSUMER_RECORDS: usize = 110;
const FULL_PROCESSING_RECORDS: usize = 750;
const FULL_DISPUTES: usize = 20;

fn random_date(rng: &mut impl Rng, start_year: u32, end_year: u32) -> String {
    format!(
        "{}-{:02}-{:02}",
        rng.gen_range(start_year..=end_year),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28)
    )
}

fn random_timestamp(rng: &mut impl Rng) -> String {
    format!(
        "{}T{:02}:{:02}:{:02}Z",
        random_date(rng, 2020, 2024),
        rng.gen_range(0..24),
        rng.gen_range(0..60),
        rng.gen_range(0..60)
    )
}

fn random_alphanumeric(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

fn letter(i: usize) -> char {
    (b'A' + (i % 26) as u8) as char
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn history_document(rng: &mut impl Rng, id: i32) -> Value {
    let tradelines = (0..HISTORY_TRADELINES)
        .map(|i| {
            let history = (0..HISTORY_MONTHS)
                .map(|m| {
                    json!({
                        "month": m + 1,
                        "balance": rng.gen_range(0..10_000),
                        "status": "current",
                        "payment": rng.gen_range(0..500),
                    })
                })
                .collect::<Vec<_>>();

            json!({
                "creditor": format!("Creditor {i}"),
                "account_number": format!("{:0>16}", format!("ACCT{id}{i}")),
                "account_type": "revolving",
                "opened_date": "2020-01-15",
                "credit_limit": 5000 + i * 100,
                "current_balance": rng.gen_range(0..5000),
                "payment_history": history,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "id": id,
        "report_id": format!("RPT-{id}"),
        "subject": {
            "name": "Test Subject",
            "ssn_last4": "1234",
            "dob": "1990-01-01",
        },
        "tradelines": tradelines,
        "inquiries": [
            { "date": "2024-01-01", "creditor": "Bank A" },
            { "date": "2024-02-15", "creditor": "Bank B" },
        ],
        "public_records": [],
        "score": 750,
    })
}

fn extract_document(rng: &mut impl Rng, id: i32) -> Value {
    let mut open_accounts = 0;
    let mut total_balance = 0;
    let mut total_credit_limit = 0;

    let tradelines = (0..EXTRACT_TRADELINES)
        .map(|i| {
            let payment_history = (0..EXTRACT_SNAPSHOTS)
                .map(|m| {
                    json!({
                        "period": format!("2023-{:02}", m + 1),
                        "balance": rng.gen_range(0..50_000),
                        "status": PAYMENT_STATUSES[rng.gen_range(0..PAYMENT_STATUSES.len())],
                        "scheduledPayment": rng.gen_range(0..2000),
                        "actualPayment": rng.gen_range(0..2000),
                        "pastDueAmount": rng.gen_range(0..1000),
                    })
                })
                .collect::<Vec<_>>();

            let closed = i % 10 == 0;
            let credit_limit = 1000 + i * 500;
            let current_balance = rng.gen_range(0..8000);
            if !closed {
                open_accounts += 1;
            }
            total_balance += current_balance;
            total_credit_limit += credit_limit;

            json!({
                "tradelineId": format!("TL-{id}-{i}"),
                "creditorName": format!("Creditor {}{}", letter(i), i / 26),
                "accountNumber": random_alphanumeric(rng, 16),
                "accountType": ACCOUNT_TYPES[i % ACCOUNT_TYPES.len()],
                "accountStatus": if closed { "closed" } else { "open" },
                "openedDate": random_date(rng, 2010, 2022),
                "closedDate": if closed { Some(random_date(rng, 2022, 2024)) } else { None },
                "creditLimit": credit_limit,
                "highestBalance": 500 + rng.gen_range(0..10_000),
                "currentBalance": current_balance,
                "monthlyPayment": 50 + rng.gen_range(0..500),
                "lastActivityDate": random_date(rng, 2023, 2024),
                "paymentHistory": payment_history,
                "termsMonths": ([12, 24, 36, 48, 60][i % 5]),
                "originalAmount": 1000 + i * 1000,
                "responsibilityCode": (["individual", "joint", "authorized"][i % 3]),
            })
        })
        .collect::<Vec<_>>();

    let inquiries = (0..EXTRACT_INQUIRIES)
        .map(|i| {
            json!({
                "inquiryId": format!("INQ-{id}-{i}"),
                "inquiryDate": random_date(rng, 2022, 2024),
                "creditorName": format!("Bank {}", letter(i)),
                "industryCode": INDUSTRY_CODES[i % INDUSTRY_CODES.len()],
                "inquiryType": if i % 3 == 0 { "hard" } else { "soft" },
                "purposeCode": (["credit_card", "auto_loan", "mortgage", "personal_loan"][i % 4]),
            })
        })
        .collect::<Vec<_>>();
    let hard_inquiries = (0..EXTRACT_INQUIRIES).filter(|i| i % 3 == 0).count();

    let score_reasons = [
        ("R01", "Length of credit history"),
        ("R02", "Number of accounts with balances"),
        ("R03", "Proportion of balances to credit limits"),
        ("R04", "Recent account activity"),
        ("R05", "Number of recent inquiries"),
    ]
    .map(|(code, description)| json!({ "code": code, "description": description }));

    json!({
        "reportId": format!("RPT-{id}"),
        "generatedAt": now(),
        "consumer": {
            "consumerId": format!("CON-{id}"),
            "firstName": format!("FirstName{}", id.rem_euclid(1000)),
            "lastName": format!("LastName{}", id.rem_euclid(1000)),
            "dateOfBirth": random_date(rng, 1950, 2000),
            "ssnMasked": format!("XXX-XX-{:04}", id.rem_euclid(10_000)),
        },
        "scores": [
            {
                "scoreType": "primary",
                "scoreValue": 300 + rng.gen_range(0..550),
                "scoreDate": random_date(rng, 2024, 2024),
                "scoreReasons": &score_reasons[0..4],
            },
            {
                "scoreType": "industry",
                "scoreValue": 300 + rng.gen_range(0..550),
                "scoreDate": random_date(rng, 2024, 2024),
                "scoreReasons": &score_reasons[1..5],
            },
        ],
        "tradelines": tradelines,
        "inquiries": inquiries,
        "publicRecords": [],
        "collections": [],
        "summary": {
            "totalAccounts": EXTRACT_TRADELINES,
            "openAccounts": open_accounts,
            "closedAccounts": EXTRACT_TRADELINES - open_accounts,
            "totalBalance": total_balance,
            "totalCreditLimit": total_credit_limit,
            "hardInquiries": hard_inquiries,
            "softInquiries": EXTRACT_INQUIRIES - hard_inquiries,
        },
    })
}

fn full_document(rng: &mut impl Rng, id: i32) -> Value {
    let addresses = (0..FULL_CONSUMER_RECORDS)
        .map(|i| {
            json!({
                "addressId": format!("ADDR-{id}-{i}"),
                "addressLine1": format!("{} Street {}", 100 + i, letter(i)),
                "addressLine2": if i % 5 == 0 { Some(format!("Apt {i}")) } else { None },
                "city": format!("City{}", i % 50),
                "state": STATES[i % STATES.len()],
                "zipCode": format!("{}", 10_000 + i * 100),
                "addressType": (["current", "previous", "mailing"][i % 3]),
                "reportedDate": random_date(rng, 2015, 2024),
                "verifiedDate": if i % 2 == 0 { Some(random_date(rng, 2023, 2024)) } else { None },
                "sourceCode": format!("SRC{}", i % 10),
                "residencyMonths": rng.gen_range(0..120),
            })
        })
        .collect::<Vec<_>>();

    let employers = (0..FULL_CONSUMER_RECORDS)
        .map(|i| {
            json!({
                "employerId": format!("EMP-{id}-{i}"),
                "employerName": format!("Company {}{} Inc", letter(i), i / 26),
                "occupation": (["engineer", "manager", "analyst", "director", "specialist"][i % 5]),
                "industry": (["technology", "finance", "healthcare", "retail", "manufacturing"][i % 5]),
                "employmentStatus": (["employed", "self_employed", "unemployed", "retired"][i % 4]),
                "startDate": random_date(rng, 2010, 2022),
                "endDate": if i % 4 == 2 { Some(random_date(rng, 2022, 2024)) } else { None },
                "income": 30_000 + rng.gen_range(0..170_000),
                "incomeFrequency": (["annual", "monthly", "weekly"][i % 3]),
                "verifiedDate": if i % 3 == 0 { Some(random_date(rng, 2023, 2024)) } else { None },
                "sourceCode": format!("SRC{}", i % 10),
            })
        })
        .collect::<Vec<_>>();

    let phone_numbers = (0..FULL_CONSUMER_RECORDS)
        .map(|i| {
            json!({
                "phoneId": format!("PHN-{id}-{i}"),
                "phoneNumber": format!("{}-{}-{}", 200 + i % 800, 100 + i % 900, 1000 + i % 9000),
                "phoneType": (["mobile", "home", "work"][i % 3]),
                "isPrimary": i == 0,
                "reportedDate": random_date(rng, 2018, 2024),
                "verifiedDate": if i % 2 == 0 { Some(random_date(rng, 2023, 2024)) } else { None },
                "sourceCode": format!("SRC{}", i % 10),
            })
        })
        .collect::<Vec<_>>();

    let processing_records = (0..FULL_PROCESSING_RECORDS)
        .map(|i| {
            json!({
                "recordId": format!("PROC-{id}-{i}"),
                "recordType": (["tradeline", "inquiry", "public_record", "collection", "consumer_statement"][i % 5]),
                "sourceId": format!("SOURCE-{}", i % 20),
                "sourceType": (["bureau", "creditor", "public", "consumer"][i % 4]),
                "receivedAt": random_timestamp(rng),
                "processedAt": random_timestamp(rng),
                "status": (["processed", "pending", "error", "archived"][i % 4]),
                "validationScore": rng.gen_range(0..100),
                "matchConfidence": rng.gen::<f64>(),
                "metadata": {
                    "version": format!("v{}.{}.0", 1 + i % 5, i % 10),
                    "checksum": random_alphanumeric(rng, 32),
                    "encoding": "UTF-8",
                    "compressionType": if i % 3 == 0 { "gzip" } else { "none" },
                    "sizeBytes": 100 + rng.gen_range(0..10_000),
                    "processingTimeMs": rng.gen_range(0..1000),
                    "retryCount": if i % 10 == 0 { rng.gen_range(0..3) } else { 0 },
                    "priority": (["low", "medium", "high", "critical"][i % 4]),
                    "tags": [format!("tag{}", i % 10), format!("category{}", i % 5)],
                },
                "rawData": {
                    "originalFormat": (["xml", "json", "csv", "fixed_width"][i % 4]),
                    "fieldCount": 10 + i % 50,
                    "nullFields": i % 10,
                    "warningCount": i % 5,
                    "transformations": [format!("transform_{}", i % 8)],
                },
            })
        })
        .collect::<Vec<_>>();

    let disputes = (0..FULL_DISPUTES)
        .map(|i| {
            let resolved = i % 4 == 2 || i % 4 == 3;
            json!({
                "disputeId": format!("DISP-{id}-{i}"),
                "disputeType": (["accuracy", "identity", "fraud", "duplicate"][i % 4]),
                "disputeStatus": (["open", "investigating", "resolved", "rejected"][i % 4]),
                "filedDate": random_date(rng, 2022, 2024),
                "resolvedDate": if resolved { Some(random_date(rng, 2023, 2024)) } else { None },
                "relatedRecordId": format!("PROC-{id}-{}", i * 10),
                "description": format!("Dispute regarding record {i}"),
                "resolution": match i % 4 {
                    2 => Some("corrected"),
                    3 => Some("verified_accurate"),
                    _ => None,
                },
            })
        })
        .collect::<Vec<_>>();

    let id_index = id.rem_euclid(1_000_000) as usize;

    json!({
        "rawReportId": format!("RAW-{id}"),
        "bureauCode": (["experian", "equifax", "transunion"][id_index % 3]),
        "pullDate": now(),
        "consumer": {
            "consumerId": format!("CON-{id}"),
            "firstName": format!("FirstName{}", id_index % 1000),
            "middleName": if id_index % 3 == 0 { Some(format!("MiddleName{}", id_index % 100)) } else { None },
            "lastName": format!("LastName{}", id_index % 1000),
            "suffix": if id_index % 20 == 0 { Some(["Jr", "Sr", "III"][id_index % 3]) } else { None },
            "dateOfBirth": random_date(rng, 1950, 2000),
            "ssnFull": format!("{:03}-{:02}-{:04}", 100 + id_index % 900, 10 + id_index % 90, id_index % 10_000),
            "addresses": addresses,
            "employers": employers,
            "phoneNumbers": phone_numbers,
        },
        "processingRecords": processing_records,
        "disputes": disputes,
        "metadata": {
            "version": "2.0.0",
            "schemaVersion": "1.5.0",
            "generatedBy": "benchmark-generator",
            "processingNode": format!("node-{}", id_index % 10),
            "totalRecords": FULL_PROCESSING_RECORDS,
            "totalConsumerRecords": FULL_CONSUMER_RECORDS * 3,
            "checksums": {
                "consumer": random_alphanumeric(rng, 64),
                "processing": random_alphanumeric(rng, 64),
                "disputes": random_alphanumeric(rng, 64),
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Field names and array lengths, with every leaf value erased.
    fn shape(value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), shape(value)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(shape).collect()),
            _ => Value::Null,
        }
    }

    fn serialized_len(value: &Value) -> usize {
        serde_json::to_vec(value).unwrap().len()
    }

    #[test]
    fn standard_document_carries_its_id() {
        for id in [0, 1, 42, random_id(), i32::MAX - 1] {
            assert_eq!(json!(id), standard_jsonb(id)["id"]);
        }
    }

    #[test]
    fn random_ids_fit_int4() {
        for _ in 0..1000 {
            assert!(random_id() >= 0);
        }
    }

    #[test]
    fn size_classes_are_within_a_fifth_of_nominal() {
        for class in [SizeClass::History, SizeClass::Extract, SizeClass::Full] {
            for id in [7, 2_000_042, random_id()] {
                let len = serialized_len(&class.generate(id)) as f64;
                let nominal = class.nominal_bytes() as f64;
                assert!(
                    (len - nominal).abs() <= nominal * 0.2,
                    "{class:?} document for id {id} was {len} bytes"
                );
            }
        }
    }

    #[test]
    fn size_class_shapes_do_not_depend_on_id() {
        for class in [SizeClass::History, SizeClass::Extract, SizeClass::Full] {
            let first = shape(&class.generate(3));
            let second = shape(&class.generate(1_234_567));
            assert_eq!(first, second, "{class:?} shape changed with the id");

            let again = shape(&class.generate(3));
            assert_eq!(first, again, "{class:?} shape changed between calls");
        }
    }

    #[test]
    fn containment_seeds_cover_the_alphabet() {
        let values = CONTAINMENT_RANGE
            .ids()
            .map(|(index, id)| containment_seed(id, index)["string"].to_string())
            .collect::<std::collections::HashSet<_>>();

        assert_eq!(CONTAINMENT_ALPHABET as usize, values.len());
        for _ in 0..50 {
            assert!(values.contains(&containment_pattern()["string"].to_string()));
        }
    }

    #[test]
    fn containment_seed_layout() {
        assert_eq!(
            json!({
                "id": 2_000_013,
                "string": "value3",
                "number": 3,
                "nested": { "string": "world", "number": 13 },
            }),
            containment_seed(2_000_013, 13)
        );
    }

    #[test]
    fn seed_ranges_are_inclusive_and_disjoint() {
        assert_eq!(2_000_099, CONTAINMENT_RANGE.end());
        assert_eq!(1_000_099, EQUALITY_RANGE.end());
        assert!(EQUALITY_RANGE.end() < CONTAINMENT_RANGE.start);

        let ids = EQUALITY_RANGE.ids().collect::<Vec<_>>();
        assert_eq!(100, ids.len());
        assert_eq!((0, 1_000_000), ids[0]);
        assert_eq!((99, 1_000_099), ids[99]);
    }

    #[test]
    fn equality_probes_hit_seed_rows() {
        assert_eq!(
            ("user7".to_string(), "user7@example.com".to_string()),
            equality_seed(7)
        );

        let emails = EQUALITY_RANGE
            .ids()
            .map(|(index, _)| equality_seed(index).1)
            .collect::<Vec<_>>();
        for _ in 0..50 {
            assert!(emails.contains(&equality_probe(EQUALITY_RANGE)));
        }
    }
}
