use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use kairos_client::{
    CancellationToken, EventSubscription, HttpNotebookApi, NotebookApi, NotebookSession,
    Notifier, PollSettings,
};
use kairos_core::PING_EVENT;
use kairos_logging::{kairos_debug, kairos_info};

use crate::cli::{Cli, Command, LiveCommand};
use crate::config::{remember_notebook, AppConfig};
use crate::console::{self, ConsoleNotifier};
use crate::export::export_notebook;

struct Env {
    api: Arc<HttpNotebookApi>,
    poll: PollSettings,
    notifier: Arc<dyn Notifier>,
}

impl Env {
    fn session(&self, notebook_id: &str) -> NotebookSession {
        NotebookSession::new(
            notebook_id,
            self.api.clone(),
            self.poll.clone(),
            self.notifier.clone(),
        )
    }

    async fn loaded(&self, notebook_id: &str) -> Result<NotebookSession> {
        let session = self.session(notebook_id);
        session.load().await?;
        Ok(session)
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?.overlay(&cli);
    let env = Env {
        api: Arc::new(HttpNotebookApi::new(config.client_settings())?),
        poll: config.poll_settings(),
        notifier: Arc::new(ConsoleNotifier),
    };
    kairos_debug!("using service at {}", config.base_url);

    match cli.command {
        Command::Config { save } => {
            let pretty = ron::ser::PrettyConfig::new();
            println!("{}", ron::ser::to_string_pretty(&config, pretty)?);
            if save {
                config.save(&cli.config)?;
                println!("saved to {}", cli.config.display());
            }
            return Ok(());
        }
        Command::Create { name, path } => {
            let session = NotebookSession::create(
                env.api.clone(),
                name.as_deref(),
                path.as_deref(),
                env.poll.clone(),
                env.notifier.clone(),
            )
            .await?;
            remember_notebook(&cli.config, session.notebook_id())?;
            println!("{}", session.notebook_id());
            return Ok(());
        }
        Command::Load { path } => {
            let session = NotebookSession::open_path(
                env.api.clone(),
                path.as_deref(),
                env.poll.clone(),
                &interrupt_token(),
                env.notifier.clone(),
            )
            .await?;
            remember_notebook(&cli.config, session.notebook_id())?;
            print!("{}", console::render_overview(&session.view()));
            return Ok(());
        }
        _ => {}
    }

    let notebook_id = cli
        .notebook
        .clone()
        .or_else(|| config.last_notebook.clone())
        .ok_or_else(|| anyhow!("no notebook selected; pass --notebook or run `kairos create`"))?;
    run_for_notebook(&env, &notebook_id, cli.command).await?;
    remember_notebook(&cli.config, &notebook_id)
}

async fn run_for_notebook(env: &Env, notebook_id: &str, command: Command) -> Result<()> {
    match command {
        Command::Show => {
            let session = env.loaded(notebook_id).await?;
            print!("{}", console::render_overview(&session.view()));
        }
        Command::Rename { name } => {
            let session = env.loaded(notebook_id).await?;
            session.rename(&name).await?;
            println!("{}", session.view().name);
        }
        Command::Run { prompt } => {
            let session = env.loaded(notebook_id).await?;
            print_output(session.run(&prompt).await?);
        }
        Command::Generate { prompt, save } => {
            let session = env.loaded(notebook_id).await?;
            print_output(session.generate(&prompt).await?);
            save_if(&session, save).await?;
        }
        Command::Edit {
            selection,
            prompt,
            save,
        } => {
            let session = env.loaded(notebook_id).await?;
            print_output(session.edit(&selection, &prompt).await?);
            save_if(&session, save).await?;
        }
        Command::Chat { prompt } => {
            let session = env.loaded(notebook_id).await?;
            print_output(session.chat(&prompt).await?);
        }
        Command::Ideas => {
            let session = env.loaded(notebook_id).await?;
            print_output(session.ideas().await?);
        }
        Command::AddSource { kind, origin } => {
            let session = env.loaded(notebook_id).await?;
            session.add_source(kind, &origin).await?;
            println!("{} sources", session.view().sources.len());
        }
        Command::Summary {
            source_id,
            last_k,
            content,
        } => {
            let session = env.loaded(notebook_id).await?;
            if content {
                println!("{}", session.source_content(&source_id).await?);
            } else {
                print_output(session.source_summary(&source_id, last_k).await?);
            }
        }
        Command::Live(live) => run_live(env, notebook_id, live).await?,
        Command::Jobs => {
            let session = env.session(notebook_id);
            session.refresh_jobs().await?;
            print!("{}", console::render_jobs(&session.view()));
        }
        Command::Pca => {
            let session = env.loaded(notebook_id).await?;
            print!("{}", console::render_pca(&session.pca().await?));
        }
        Command::Export(args) => {
            let notebook = env.api.notebook(notebook_id).await?;
            let written = export_notebook(notebook_id, &notebook, args.format, &args.output)?;
            println!("wrote {}", written.display());
        }
        Command::Watch { ping } => watch(env, notebook_id, ping).await?,
        Command::Ping => println!("{}", env.api.ping(notebook_id).await?),
        Command::Config { .. } | Command::Create { .. } | Command::Load { .. } => {
            bail!("command does not operate on an existing notebook")
        }
    }
    Ok(())
}

async fn run_live(env: &Env, notebook_id: &str, command: LiveCommand) -> Result<()> {
    let session = env.loaded(notebook_id).await?;
    match command {
        LiveCommand::Start { kind, origin } => {
            println!("{}", session.start_live_source(kind, &origin).await?);
        }
        LiveCommand::Stop { source_id } => {
            if session.stop_live_source(&source_id).await? {
                println!("stopped {source_id}");
            } else {
                println!("{source_id} was not running");
            }
        }
        LiveCommand::List => {
            for row in session.view().live_sources {
                let state = if row.running { "running" } else { "stopped" };
                println!("{}  {:<7} {}  {state}", row.id, row.kind.as_str(), row.origin);
            }
        }
        LiveCommand::Summary { source_id, last_k } => {
            print_output(session.live_source_summary(&source_id, last_k).await?);
        }
    }
    Ok(())
}

/// Print pushed events until the stream ends or Ctrl-C. Events other than
/// `ping` re-sync the notebook cache.
async fn watch(env: &Env, notebook_id: &str, ping: bool) -> Result<()> {
    let session = env.loaded(notebook_id).await?;
    let mut events = EventSubscription::open(&env.api, notebook_id, session.cancellation_token());
    // The service may hold back the stream headers until the first event.
    if ping {
        env.api.ping(notebook_id).await?;
    }
    kairos_info!("watching notebook {}", notebook_id);

    let interrupted = interrupt_token();
    loop {
        let event = tokio::select! {
            _ = interrupted.cancelled() => break,
            event = events.next() => event,
        };
        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(err)) => {
                session.close();
                return Err(err).with_context(|| format!("cannot watch notebook {notebook_id}"));
            }
            None => {
                println!("event stream closed by the service");
                break;
            }
        };
        let changed = event.name != PING_EVENT;
        if changed {
            println!("{}", console::event_line(Local::now(), &event));
        }
        session.apply_server_event(event);
        if changed && session.refresh().await.is_ok() {
            print!("{}", console::render_jobs(&session.view()));
        }
    }
    session.close();
    Ok(())
}

/// Token cancelled on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let interrupted = CancellationToken::new();
    let on_signal = interrupted.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    interrupted
}

async fn save_if(session: &NotebookSession, save: bool) -> Result<()> {
    if save {
        session.save(None).await?;
        println!("saved");
    }
    Ok(())
}

fn print_output(output: Option<String>) {
    match output {
        Some(text) => println!("{text}"),
        None => println!("(no output)"),
    }
}
