use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use kycgate::domain::IdentityNumber;
use kycgate::ledger::AccountLedger;
use kycgate::provisioning::{account_number, AccountApplication, Provisioner};
use kycgate::registry::{mask_by_access_level, parse_registry, RegistryAdapter, StaticRegistry};
use kycgate::scoring::{compute_score, recommend, TrustFactors};
use kycgate::tier::TierTable;

const REGISTRY: &str = include_str!("../data/registry.yaml");

fn registry() -> StaticRegistry {
    parse_registry(REGISTRY).expect("bundled registry parses")
}

fn provisioner(registry: Arc<StaticRegistry>) -> Provisioner {
    Provisioner::new(
        RegistryAdapter::new(registry, Duration::from_millis(500)),
        AccountLedger::in_memory(),
        Arc::new(TierTable::standard()),
    )
}

fn application() -> AccountApplication {
    AccountApplication {
        identity_type: Some("NIN".to_string()),
        identity_number: Some("12345678901".to_string()),
        first_name: Some("Aisha".to_string()),
        last_name: Some("Mohammed".to_string()),
        dob: Some("1995-03-15".to_string()),
        email: Some("aisha@example.com".to_string()),
        phone: Some("08012345678".to_string()),
        address: Some("123 Main St, Ikeja, Lagos".to_string()),
        latitude: Some(6.6),
        longitude: Some(3.35),
        face_verified: true,
        documents_uploaded: true,
    }
}

fn bench_trust_score(c: &mut Criterion) {
    let factors = TrustFactors {
        nin_verified: true,
        address_verified: true,
        face_matched: true,
        gps_valid: true,
        ..Default::default()
    };

    c.bench_function("trust_score_compute", |b| {
        b.iter(|| recommend(compute_score(black_box(&factors))))
    });
}

fn bench_account_number(c: &mut Criterion) {
    let identity = IdentityNumber::parse("12345678901").expect("valid identity");
    let dob = NaiveDate::from_ymd_opt(1995, 3, 15).expect("valid date");

    c.bench_function("account_number_generate", |b| {
        b.iter(|| account_number::generate(black_box(dob), black_box(&identity)))
    });
}

fn bench_registry_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let provisioner = provisioner(Arc::new(registry()));

    c.bench_function("verify_nin_masked", |b| {
        b.to_async(&rt)
            .iter(|| async { provisioner.verify_nin(black_box(Some("23456789012"))).await })
    });
}

fn bench_masking(c: &mut Criterion) {
    let seed: serde_yaml::Value = serde_yaml::from_str(REGISTRY).expect("yaml");
    let record = serde_yaml::from_value(seed["nin_records"][0].clone()).expect("nin record");

    c.bench_function("mask_by_access_level", |b| {
        b.iter(|| mask_by_access_level(black_box(&record)))
    });
}

fn bench_create_account(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let registry = Arc::new(registry());

    c.bench_function("create_account_end_to_end", |b| {
        b.to_async(&rt).iter_batched(
            || (provisioner(registry.clone()), application()),
            |(provisioner, application)| async move {
                provisioner.create_account(application).await
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_trust_score,
    bench_account_number,
    bench_registry_lookup,
    bench_masking,
    bench_create_account,
);

criterion_main!(benches);
