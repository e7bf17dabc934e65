use std::{env::temp_dir, fs};

use alert_mailer::{config::ResolvedProfile, message::OutgoingMessage};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn profile() -> ResolvedProfile {
    ResolvedProfile {
        server: "localhost".to_owned(),
        port: 25,
        tls: false,
        ssl: false,
        sender: Some("Device <device@example.com>".to_owned()),
        login: None,
        password: None,
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let profile = profile();
    let snapshot = temp_dir().join("alert-mailer-bench-snapshot.jpg");
    fs::write(&snapshot, vec![0xA5; 64 * 1024]).unwrap();

    c.bench_function("compose text message", |b| {
        let message = OutgoingMessage::new("Door opened", "The <b>front door</b> was opened")
            .to("me@example.com")
            .cc("partner@example.com");
        b.iter(|| black_box(&message).compose(&profile).unwrap().formatted())
    });
    c.bench_function("compose message with attachment", |b| {
        let message = OutgoingMessage::new("Motion detected", "See the attached snapshot")
            .to("me@example.com")
            .attach(&snapshot);
        b.iter(|| black_box(&message).compose(&profile).unwrap().formatted())
    });

    let _ = fs::remove_file(snapshot);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
