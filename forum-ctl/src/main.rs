use std::io::{BufRead, Write};

use anyhow::{anyhow, Context};
use chrono::Utc;
use forum_client::{
    api::{BoardId, CommentId, PostId},
    BoardList, ClientConfig, CommentSection, CommentView, Confirm, Locale, Notice, Notifier,
    Outcome, Tone,
};
use tracing_subscriber::EnvFilter;

mod http;
use http::HttpRemote;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Base URL of the forum API
    #[structopt(short, long, env = "FORUM_HOST")]
    host: String,

    /// Bearer token of the acting user
    #[structopt(long, env = "FORUM_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[structopt(long, env = "FORUM_LOCALE", default_value = "en")]
    locale: Locale,

    /// Number of comments the server sends per page
    #[structopt(long, env = "FORUM_PAGE_SIZE", default_value = "20")]
    page_size: usize,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Show the comments of a post
    Thread { post: i64 },

    /// Comment on a post
    Comment { post: i64, text: String },

    /// Reply to a comment
    Reply {
        post: i64,
        parent: i64,
        text: String,
    },

    /// Change the text of one of your comments
    Edit { post: i64, id: i64, text: String },

    /// Delete one of your comments
    Delete {
        post: i64,
        id: i64,

        /// Do not ask for confirmation
        #[structopt(short, long)]
        yes: bool,
    },

    /// Like a comment, or remove your like
    Like { post: i64, id: i64 },

    /// List the boards
    Boards,

    /// Follow a board, or stop following it
    Follow { board: String },
}

struct Stderr;

impl Notifier for Stderr {
    fn notify(&self, notice: Notice) {
        match notice.tone {
            Tone::Success => eprintln!("{}", notice.message),
            Tone::Failure => eprintln!("error: {}", notice.message),
        }
    }
}

struct Prompt {
    assume_yes: bool,
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(e) => {
                tracing::warn!(%e, "failed reading confirmation");
                false
            }
        }
    }
}

fn check(outcome: Outcome, what: &str) -> anyhow::Result<()> {
    match outcome {
        Outcome::Applied => Ok(()),
        Outcome::RolledBack(e) | Outcome::Failed(e) => {
            Err(anyhow::Error::new(e).context(format!("{what} failed")))
        }
        Outcome::Skipped(s) => Err(anyhow::Error::new(s).context(format!("{what} not attempted"))),
        Outcome::Discarded => Err(anyhow!("{what} was interrupted")),
    }
}

fn print_comment(c: &CommentView) {
    let indent = "    ".repeat(c.depth);
    println!(
        "{indent}#{} {} ({}, {} likes{})",
        c.id,
        c.author_name,
        c.time_label,
        c.likes_label,
        if c.is_liked { ", liked" } else { "" },
    );
    for line in c.text.lines() {
        println!("{indent}  {line}");
    }
    for r in &c.replies {
        print_comment(r);
    }
}

async fn section(
    opt: &Opt,
    config: ClientConfig,
    post: i64,
    assume_yes: bool,
) -> anyhow::Result<CommentSection<HttpRemote, Stderr, Prompt>> {
    let section = CommentSection::new(
        PostId(post),
        HttpRemote::new(&opt.host, opt.token.clone()),
        Stderr,
        Prompt { assume_yes },
        config,
    );
    check(section.refresh().await, "loading comments")?;
    Ok(section)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let config = ClientConfig {
        page_size: opt.page_size,
        locale: opt.locale,
        ..ClientConfig::default()
    };

    match opt.cmd {
        Command::Thread { post } => {
            let view = section(&opt, config, post, false).await?.view(Utc::now());
            match view.placeholder {
                Some(p) => println!("{p}"),
                None => view.roots.iter().for_each(print_comment),
            }
        }
        Command::Comment { post, ref text } => {
            let s = section(&opt, config, post, false).await?;
            check(s.submit_root_comment(text).await, "posting comment")?;
        }
        Command::Reply {
            post,
            parent,
            ref text,
        } => {
            let s = section(&opt, config, post, false).await?;
            check(
                s.submit_reply(CommentId(parent), text).await,
                "posting reply",
            )?;
        }
        Command::Edit { post, id, ref text } => {
            let s = section(&opt, config, post, false).await?;
            if !s.request_edit(CommentId(id)) {
                return Err(anyhow!("comment #{id} cannot be edited"));
            }
            check(s.confirm_edit(CommentId(id), text).await, "editing comment")?;
        }
        Command::Delete { post, id, yes } => {
            let s = section(&opt, config, post, yes).await?;
            check(s.request_delete(CommentId(id)).await, "deleting comment")?;
        }
        Command::Like { post, id } => {
            let s = section(&opt, config, post, false).await?;
            check(s.toggle_like(CommentId(id)).await, "liking comment")?;
        }
        Command::Boards => {
            let boards = BoardList::new(
                HttpRemote::new(&opt.host, opt.token.clone()),
                Stderr,
                config,
            );
            check(boards.refresh().await, "loading boards")?;
            for b in boards.boards() {
                println!(
                    "{}\t{}\t{} followers{}",
                    b.id,
                    b.title,
                    forum_client::time::compact_count(b.follower_count),
                    if b.is_follow { ", following" } else { "" },
                );
            }
        }
        Command::Follow { ref board } => {
            let boards = BoardList::new(
                HttpRemote::new(&opt.host, opt.token.clone()),
                Stderr,
                config,
            );
            check(boards.refresh().await, "loading boards")?;
            let id = BoardId::from(board.as_str());
            check(boards.toggle_follow(&id).await, "following board")
                .with_context(|| format!("on board {id}"))?;
        }
    }

    Ok(())
}
