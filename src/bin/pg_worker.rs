//! Runs one embedded `PostgreSQL` lifecycle step for the integration tests.
//!
//! ```text
//! pg_worker <setup|start|stop> <payload.json>
//! ```
//!
//! The payload is a serialized `WorkerPayload` holding the cluster settings
//! and environment overrides. When launched as root the worker re-executes
//! itself as `nobody`, because `initdb` and `postgres` refuse to run as the
//! superuser.

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    lifecycle::main()
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker is only supported on Unix platforms".into())
}

#[cfg(unix)]
mod lifecycle {
    use super::BoxError;
    use camino::{Utf8Path, Utf8PathBuf};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use thiserror::Error;

    const REEXEC_MARKER: &str = "PG_WORKER_REEXEC";
    const TRUSTED_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    enum WorkerFault {
        #[error("invalid arguments: {0}")]
        Usage(String),
        #[error("failed to read payload: {0}")]
        PayloadRead(#[source] BoxError),
        #[error("failed to parse payload: {0}")]
        PayloadParse(#[source] serde_json::Error),
        #[error("invalid cluster settings: {0}")]
        Settings(String),
        #[error("failed to build runtime: {0}")]
        Runtime(#[source] io::Error),
        #[error("failed to drop privileges: {0}")]
        Privileges(String),
        #[error("postgres {step} failed: {message}")]
        Postgres { step: &'static str, message: String },
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Setup,
        Start,
        Stop,
    }

    impl Step {
        fn parse(raw: &str) -> Result<Self, WorkerFault> {
            match raw {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(WorkerFault::Usage(format!(
                    "unknown step '{other}'; expected setup, start or stop"
                ))),
            }
        }

        const fn name(self) -> &'static str {
            match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            }
        }
    }

    pub(super) fn main() -> Result<(), BoxError> {
        let args = utf8_args()?;
        reexec_unprivileged(&args)?;
        run(&args).map_err(Into::into)
    }

    fn utf8_args() -> Result<Vec<Utf8PathBuf>, WorkerFault> {
        env::args_os()
            .map(|arg| {
                arg.into_string()
                    .map(Utf8PathBuf::from)
                    .map_err(|_| WorkerFault::Usage("argument is not valid UTF-8".into()))
            })
            .collect()
    }

    fn run(args: &[Utf8PathBuf]) -> Result<(), WorkerFault> {
        let (step, payload_path) = match args {
            [_, raw_step, payload] => (Step::parse(raw_step.as_str())?, payload),
            _ => {
                return Err(WorkerFault::Usage(
                    "expected exactly <step> <payload.json>".into(),
                ));
            }
        };
        let payload = load_payload(payload_path)?;
        drop_privileges()?;
        let settings = payload
            .settings
            .into_settings()
            .map_err(|err| WorkerFault::Settings(err.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerFault::Runtime)?;
        apply_environment(&payload.environment);

        let mut postgres = PostgreSQL::new(settings);
        runtime.block_on(async {
            match step {
                Step::Setup => {
                    postgres.setup().await.map_err(|err| failed(step, &err))?;
                    ensure_started(&mut postgres, step).await
                }
                Step::Start => {
                    ensure_started(&mut postgres, step).await?;
                    // Dropping the handle would stop the server the worker just started.
                    std::mem::forget(postgres);
                    Ok(())
                }
                Step::Stop => postgres.stop().await.map_err(|err| failed(step, &err)),
            }
        })
    }

    fn failed(step: Step, err: &impl std::fmt::Display) -> WorkerFault {
        WorkerFault::Postgres {
            step: step.name(),
            message: err.to_string(),
        }
    }

    async fn ensure_started(postgres: &mut PostgreSQL, step: Step) -> Result<(), WorkerFault> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres.start().await.map_err(|err| failed(step, &err))
    }

    fn load_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerFault> {
        let bytes = read_payload(path).map_err(WorkerFault::PayloadRead)?;
        serde_json::from_slice(&bytes).map_err(WorkerFault::PayloadParse)
    }

    fn read_payload(path: &Utf8Path) -> Result<Vec<u8>, BoxError> {
        let (dir, relative) = ambient_dir_and_path(path)?;
        let mut file = dir.open(relative.as_std_path())?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn reexec_unprivileged(args: &[Utf8PathBuf]) -> Result<(), WorkerFault> {
        if !Uid::effective().is_root() || env::var_os(REEXEC_MARKER).is_some() {
            return Ok(());
        }

        let exe = env::current_exe()
            .map_err(WorkerFault::Runtime)?
            .into_os_string()
            .into_string()
            .map(Utf8PathBuf::from)
            .map_err(|_| WorkerFault::Runtime(io::Error::other("executable path is not UTF-8")))?;
        let forwarded = args.get(1..).unwrap_or_default();

        let status = match Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(exe.as_std_path())
            .args(forwarded.iter().map(|arg| arg.as_std_path()))
            .env(REEXEC_MARKER, "1")
            .env("PATH", TRUSTED_PATH)
            .status()
        {
            Ok(status) => status,
            Err(err) if err.kind() == io::ErrorKind::NotFound => reexec_via_su(&exe, forwarded)?,
            Err(err) => return Err(WorkerFault::Privileges(err.to_string())),
        };

        std::process::exit(status.code().unwrap_or(1));
    }

    fn reexec_via_su(exe: &Utf8Path, forwarded: &[Utf8PathBuf]) -> Result<ExitStatus, WorkerFault> {
        let command = std::iter::once(exe)
            .chain(forwarded.iter().map(Utf8PathBuf::as_path))
            .map(|part| shell_quote(part.as_str()))
            .fold(format!("{REEXEC_MARKER}=1 exec"), |mut line, part| {
                line.push(' ');
                line.push_str(&part);
                line
            });

        Command::new("/bin/su")
            .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
            .arg(command)
            .env("PATH", TRUSTED_PATH)
            .status()
            .map_err(|err| WorkerFault::Privileges(err.to_string()))
    }

    /// Wraps `value` in single quotes for a POSIX shell.
    fn shell_quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "'\\''"))
    }

    fn drop_privileges() -> Result<(), WorkerFault> {
        if !Uid::effective().is_root() {
            return Ok(());
        }

        let user = User::from_name(UNPRIVILEGED_USER)
            .map_err(|err| WorkerFault::Privileges(err.to_string()))?
            .ok_or_else(|| {
                WorkerFault::Privileges(format!("user '{UNPRIVILEGED_USER}' not found"))
            })?;
        let name = CString::new(user.name.clone())
            .map_err(|err| WorkerFault::Privileges(err.to_string()))?;
        initgroups(&name, user.gid).map_err(|err| WorkerFault::Privileges(err.to_string()))?;
        setgid(user.gid).map_err(|err| WorkerFault::Privileges(err.to_string()))?;
        setuid(user.uid).map_err(|err| WorkerFault::Privileges(err.to_string()))?;

        // SAFETY: no other thread exists yet; the runtime is built afterwards.
        unsafe {
            env::set_var("HOME", user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: the current-thread runtime has not spawned any worker
            // threads, so nothing reads the environment concurrently.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }

}
