//! Build script: renders the `pimed(1)` manual page for packagers.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, format_description::well_known::Iso8601};

const EPOCH_DATE: &str = "1970-01-01";

/// Date stamped into the page header, honouring reproducible builds.
fn page_date() -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return EPOCH_DATE.to_owned();
    };
    let formatted = raw
        .parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| moment.format(&Iso8601::DATE).ok());
    formatted.unwrap_or_else(|| {
        println!("cargo:warning=ignoring unusable SOURCE_DATE_EPOCH '{raw}'");
        EPOCH_DATE.to_owned()
    })
}

/// `target/generated-man/<triple>/<profile>`, located from `OUT_DIR`.
fn packaging_dir() -> PathBuf {
    // OUT_DIR is <target>/<profile>/build/<crate>-<hash>/out.
    let target_root = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .and_then(|out| out.ancestors().nth(4).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("target"));
    let triple = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_owned());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".to_owned());
    target_root.join("generated-man").join(triple).join(profile)
}

fn install_page(dir: &Path, name: &str, contents: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let staged = dir.join(format!("{name}.tmp"));
    fs::write(&staged, contents)?;
    fs::rename(staged, dir.join(name))
}

fn render(binary: &str, version: &str, date: &str) -> String {
    let title = binary.to_uppercase();
    let mut page = format!(
        ".TH \"{title}\" \"1\" \"{date}\" \"{binary} {version}\" \"PIME Bridge Daemon\"\n\
         .SH NAME\n\
         {binary} \\- PIME input method bridge daemon\n\
         .SH SYNOPSIS\n\
         .B {binary}\n\
         [\\fB\\-\\-daemon\\-socket\\fR \\fIURL\\fR]\n\
         .SH DESCRIPTION\n\
         Accepts one connection per text-input session from the host and routes\n\
         newline-delimited JSON requests to the input service activated for that\n\
         session.\n\
         .SH ENVIRONMENT\n"
    );
    let variables = [
        ("PIME_DAEMON_SOCKET", "Listening endpoint, as unix:///path or tcp://host:port."),
        ("PIME_LOG_FILTER", "Tracing filter directives."),
        ("PIME_LOG_FORMAT", "Log output format, json or compact."),
        ("PIME_MAX_MESSAGE_BYTES", "Largest accepted request in bytes."),
    ];
    for (name, summary) in variables {
        page.push_str(&format!(".TP\n.B {name}\n{summary}\n"));
    }
    page
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for variable in ["CARGO_PKG_VERSION", "SOURCE_DATE_EPOCH", "TARGET", "PROFILE"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let binary = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "pimed".to_owned());
    let version = env::var("CARGO_PKG_VERSION")?;
    let page = render(&binary, &version, &page_date());
    let name = format!("{binary}.1");

    install_page(&packaging_dir(), &name, &page)?;
    if let Some(out_dir) = env::var_os("OUT_DIR")
        && let Err(error) = install_page(Path::new(&out_dir), &name, &page)
    {
        println!("cargo:warning=could not stage manual page in OUT_DIR: {error}");
    }
    Ok(())
}
