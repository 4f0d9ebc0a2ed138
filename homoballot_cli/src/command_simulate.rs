use chrono::{Duration, Utc};
use ed25519_dalek::SecretKey;
use homoballot::*;
use indexmap::IndexMap;
use rand::Rng;
use std::sync::Arc;
use std::thread;

#[derive(Serialize)]
struct SimulationOutput {
    election: Election,
    totals: IndexMap<String, u64>,
    results: Vec<TallyResult>,
    report: IntegrityReport,

    #[serde(skip_serializing_if = "Option::is_none")]
    audit_log: Option<Vec<AuditEntry>>,
}

fn fail(e: Error) -> ! {
    eprintln!("homoballot simulate: {}", e);
    std::process::exit(1);
}

/// Run a whole election in-process: create, vote from several threads, close,
/// tally and publish.
pub fn command_simulate(matches: &clap::ArgMatches, config: &crate::Config) {
    let candidates: Vec<String> = matches
        .value_of("candidates")
        .unwrap_or("Yes,No")
        .split(',')
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect();
    let voters = crate::parse_count(matches, "voters", 10);
    let threads = crate::parse_count(matches, "threads", 4).max(1);

    let admin = match &config.authority_secret_key {
        Some(secret) => match SecretKey::from_bytes(secret.as_bytes()) {
            Ok(secret) => AdminCapability::new(secret),
            Err(_) => {
                eprintln!("homoballot simulate: invalid administrator key");
                std::process::exit(1);
            }
        },
        None => AdminCapability::generate(),
    };

    let registry = Arc::new(Registry::new(admin.public_key(), Arc::new(AuditLog::new())));
    let ledger = Arc::new(VoteLedger::new(registry.clone()));
    let mut rng = rand::rngs::OsRng;
    let authority = Arc::new(
        KeyAuthority::generate(config.key_bits, ledger.clone(), &mut rng)
            .unwrap_or_else(|e| fail(e)),
    );

    let now = Utc::now();
    let mut election = Election::new(
        ElectionId(1),
        matches.value_of("name").unwrap_or("Simulated election"),
        now - Duration::seconds(1),
        now + Duration::hours(1),
        authority.public_key().clone(),
    );
    election.candidates = candidates.clone();
    registry.create(&admin, election).unwrap_or_else(|e| fail(e));
    let id = ElectionId(1);

    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            let ledger = ledger.clone();
            let public = authority.public_key().clone();
            let candidates = candidates.len();
            thread::spawn(move || -> Result<usize, Error> {
                let mut rng = rand::thread_rng();
                let mut anchored = 0;
                for voter in (worker..voters).step_by(threads) {
                    let choice = rng.gen_range(0, candidates);
                    let ballot =
                        EncryptedBallot::encrypt_choice(&public, choice, candidates, &mut rng)?;

                    let token = format!("voter-{}", voter);
                    let nonce: [u8; 16] = rng.gen();
                    let commitment = CommitmentHash::for_ballot(id, &ballot, &nonce);
                    ledger.submit(id, commitment, ballot, token.as_bytes())?;
                    anchored += 1;
                }
                Ok(anchored)
            })
        })
        .collect();

    let mut anchored = 0;
    for handle in handles {
        match handle.join() {
            Ok(Ok(count)) => anchored += count,
            Ok(Err(e)) => fail(e),
            Err(_) => {
                eprintln!("homoballot simulate: voter thread panicked");
                std::process::exit(1);
            }
        }
    }
    info!("homoballot: {} voters anchored their ballots", anchored);

    registry.close(&admin, id).unwrap_or_else(|e| fail(e));

    let engine = TallyEngine::new(registry.clone(), ledger.clone(), authority.clone());
    let tally = engine.tally(id).unwrap_or_else(|e| fail(e));

    let publisher = ResultPublisher::new(registry.clone());
    let results = publisher.publish(&admin, &tally).unwrap_or_else(|e| fail(e));

    let report = IntegrityReport::build(&registry, &ledger, id).unwrap_or_else(|e| fail(e));
    if !report.is_valid() {
        warn!("homoballot: integrity report flagged election {}", id);
    }

    let output = SimulationOutput {
        election: registry.get(id).unwrap_or_else(|e| fail(e)),
        totals: tally.totals(&candidates),
        results,
        report,
        audit_log: if matches.is_present("print-audit") {
            Some(registry.audit_log().entries())
        } else {
            None
        },
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("homoballot simulate: unable to encode output: {}", e);
            std::process::exit(1);
        }
    }
}
