//! Drives the SMTP transport against a scripted local server

use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    thread::{self, JoinHandle},
    time::Duration,
};

use alert_mailer::{
    config::ResolvedProfile,
    dispatch::{Kind, MailDispatcher},
    message::OutgoingMessage,
    transport::smtp::SmtpTransport,
    Error,
};
use lettre::transport::smtp::extension::ClientId;
use pretty_assertions::assert_eq;

/// Reply to a command line, `None` drops the connection
type Script = fn(&str) -> Option<&'static str>;

#[derive(Debug, Default)]
struct Received {
    commands: Vec<String>,
    message: String,
}

fn accept_all(line: &str) -> Option<&'static str> {
    let verb = line.split(' ').next().unwrap_or_default();
    Some(match verb.to_ascii_uppercase().as_str() {
        "EHLO" => "250-localhost\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME",
        "AUTH" => "235 2.7.0 Authentication successful",
        "MAIL" | "RCPT" => "250 2.1.0 Ok",
        "DATA" => "354 End data with <CR><LF>.<CR><LF>",
        "." => "250 2.0.0 Ok: queued",
        "QUIT" => "221 2.0.0 Bye",
        _ => "502 5.5.2 Command not implemented",
    })
}

fn serve(script: Script) -> (u16, JoinHandle<Received>) {
    let _ = tracing_subscriber::fmt::try_init();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        converse(stream, script)
    });

    (port, handle)
}

fn converse(mut stream: TcpStream, script: Script) -> Received {
    let mut received = Received::default();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut in_data = false;

    stream.write_all(b"220 localhost ESMTP test\r\n").unwrap();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\r', '\n']).to_owned();

        if in_data && line != "." {
            received.message.push_str(&line);
            received.message.push_str("\r\n");
            continue;
        }
        in_data = false;
        received.commands.push(line.clone());

        let Some(reply) = script(&line) else {
            break;
        };
        if stream.write_all(format!("{reply}\r\n").as_bytes()).is_err() {
            break;
        }
        if line.eq_ignore_ascii_case("DATA") && reply.starts_with("354") {
            in_data = true;
        }
        if line.eq_ignore_ascii_case("QUIT") {
            break;
        }
    }

    received
}

fn profile(port: u16, login: Option<&str>) -> ResolvedProfile {
    ResolvedProfile {
        server: "127.0.0.1".to_owned(),
        port,
        tls: false,
        ssl: false,
        sender: Some("device@example.com".to_owned()),
        login: login.map(str::to_owned),
        password: Some("secret".to_owned()),
    }
}

fn message() -> OutgoingMessage {
    OutgoingMessage::new("Water leak", "Leak detected in the basement")
        .to("me@example.com")
        .bcc("archive@example.com")
}

fn send(script: Script, login: Option<&str>) -> (Result<(), Error>, Received) {
    let (port, server) = serve(script);
    let transport = SmtpTransport::new()
        .hello_name(ClientId::Domain("alert.test".to_owned()))
        .timeout(Some(Duration::from_secs(10)));

    let result = MailDispatcher::new(transport).send(&profile(port, login), &message());
    (result, server.join().unwrap())
}

fn kind(result: Result<(), Error>) -> Kind {
    match result {
        Err(Error::Mail(err)) => err.kind(),
        other => panic!("expected a mail error, got {other:?}"),
    }
}

#[test]
fn smtp_transport_simple() {
    let (result, received) = send(accept_all, Some("device@example.com"));
    result.unwrap();

    let verbs: Vec<&str> = received
        .commands
        .iter()
        .map(|c| c.split([' ', ':']).next().unwrap_or_default())
        .collect();
    assert_eq!(verbs, ["EHLO", "AUTH", "MAIL", "RCPT", "RCPT", "DATA", ".", "QUIT"]);
    assert_eq!(received.commands[0], "EHLO alert.test");
    assert_eq!(received.commands[2], "MAIL FROM:<device@example.com>");
    assert_eq!(received.commands[3], "RCPT TO:<me@example.com>");
    assert_eq!(received.commands[4], "RCPT TO:<archive@example.com>");

    assert!(received.message.contains("To: me@example.com\r\n"));
    assert!(received.message.contains("Subject: Water leak\r\n"));
    assert!(!received.message.contains("archive@example.com"));
}

#[test]
fn no_login_no_auth() {
    let (result, received) = send(accept_all, None);
    result.unwrap();

    assert!(!received.commands.iter().any(|c| c.starts_with("AUTH")));
}

#[test]
fn auth_refused() {
    let (result, received) = send(
        |line| {
            if line.starts_with("AUTH") {
                Some("535 5.7.8 Authentication credentials invalid")
            } else {
                accept_all(line)
            }
        },
        Some("device@example.com"),
    );

    assert_eq!(kind(result), Kind::AuthFailed);
    assert_eq!(received.commands.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn sender_refused() {
    let (result, _) = send(
        |line| {
            if line.starts_with("MAIL") {
                Some("553 5.1.8 Sender address rejected")
            } else {
                accept_all(line)
            }
        },
        None,
    );

    assert_eq!(kind(result), Kind::SenderRejected);
}

#[test]
fn recipients_refused() {
    let (port, server) = serve(|line| {
        if line.starts_with("RCPT") && line.contains("archive@") {
            Some("550 5.1.1 No such user")
        } else {
            accept_all(line)
        }
    });
    let err = MailDispatcher::new(SmtpTransport::new())
        .send(&profile(port, None), &message())
        .unwrap_err();
    let received = server.join().unwrap();

    let err = err.as_mail().unwrap();
    assert_eq!(err.kind(), Kind::RecipientsRejected);
    assert_eq!(err.recipients(), ["archive@example.com"]);
    // Every recipient is offered, and nothing is sent
    assert_eq!(
        received
            .commands
            .iter()
            .filter(|c| c.starts_with("RCPT"))
            .count(),
        2
    );
    assert!(!received.commands.iter().any(|c| c == "DATA"));
}

#[test]
fn content_refused() {
    let (result, _) = send(
        |line| {
            if line == "." {
                Some("554 5.6.0 Message rejected")
            } else {
                accept_all(line)
            }
        },
        None,
    );

    assert_eq!(kind(result), Kind::ContentRejected);
}

#[test]
fn server_disconnects() {
    let (result, _) = send(
        |line| {
            if line.starts_with("MAIL") {
                None
            } else {
                accept_all(line)
            }
        },
        None,
    );

    assert_eq!(kind(result), Kind::Disconnected);
}

#[cfg(any(feature = "native-tls", feature = "rustls", feature = "boring-tls"))]
#[test]
fn server_disconnects_on_starttls() {
    let (port, server) = serve(|line| {
        if line.starts_with("EHLO") {
            Some("250-localhost\r\n250 STARTTLS")
        } else if line == "STARTTLS" {
            None
        } else {
            accept_all(line)
        }
    });
    let mut profile = profile(port, None);
    profile.tls = true;

    let err = MailDispatcher::new(SmtpTransport::new())
        .send(&profile, &message())
        .unwrap_err();
    let received = server.join().unwrap();

    assert_eq!(err.as_mail().map(|e| e.kind()), Some(Kind::Disconnected));
    assert_eq!(received.commands.last().map(String::as_str), Some("STARTTLS"));
}

#[test]
fn starttls_not_offered() {
    let (port, server) = serve(accept_all);
    let mut profile = profile(port, None);
    profile.tls = true;

    let err = MailDispatcher::new(SmtpTransport::new())
        .send(&profile, &message())
        .unwrap_err();
    let received = server.join().unwrap();

    assert_eq!(err.as_mail().map(|e| e.kind()), Some(Kind::Unknown));
    assert!(!received.commands.iter().any(|c| c.starts_with("MAIL")));
}
