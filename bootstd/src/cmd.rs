//! Command layer: `list`, `select`, `info` and `bootflows`.
//!
//! The selection lives in a [`CmdContext`] owned by the front end and
//! passed in on every call. Output goes to any [`core::fmt::Write`].

use crate::context::Bootstd;
use crate::error::{BootError, Result};
use crate::iter::{ScanFlags, ScanOptions};
use core::fmt::Write;

/// Current selection, as set by `select`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CmdContext {
    pub medium: Option<usize>,
    pub method: Option<usize>,
}

pub const USAGE: &str = "bootdev list [-p]         - list all boot media\n\
                         bootdev select [-m] <id>  - select a medium (or method with -m)\n\
                         bootdev info              - show the selection\n\
                         bootflow list [-a]        - list bootflows of the selection\n";

/// Run one command. `argv[0]` is the subcommand.
pub fn run(std: &mut Bootstd, ctx: &mut CmdContext, argv: &[&str], out: &mut dyn Write) -> Result<()> {
    let Some((&cmd, args)) = argv.split_first() else {
        out.write_str(USAGE)?;
        return Err(BootError::Invalid);
    };
    let has_flag = |flag: &str| args.iter().any(|&a| a == flag);

    match cmd {
        "list" => list(std, has_flag("-p"), out),
        "select" => {
            let id = args.iter().copied().find(|a| !a.starts_with('-'));
            select(std, ctx, id, has_flag("-m"), out)
        }
        "info" => info(std, ctx, out),
        "bootflows" => bootflows(std, ctx, has_flag("-a"), out),
        _ => {
            out.write_str(USAGE)?;
            Err(BootError::Invalid)
        }
    }
}

fn list(std: &mut Bootstd, probe: bool, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Seq  Probed  Status  Uclass    Name")?;
    writeln!(out, "---  ------  ------  --------  ------------------")?;
    for seq in 0..std.media.len() {
        if probe {
            // The failure is kept on the handle and shown in the status column
            let _ = std.media.probe(seq);
        }
        let Some(medium) = std.media.get(seq) else {
            continue;
        };
        let status = match (medium.is_probed(), medium.last_error()) {
            (true, _) => "OK",
            (false, Some(e)) => e.name(),
            (false, None) => "-",
        };
        writeln!(
            out,
            "{:3x}   [ {} ]  {:>6}  {:<9.9} {}",
            seq,
            if medium.is_probed() { '+' } else { ' ' },
            status,
            medium.uclass(),
            medium.name()
        )?;
    }
    writeln!(out, "---  ------  ------  --------  ------------------")?;
    writeln!(out, "({} media)", std.media.len())?;
    Ok(())
}

fn select(
    std: &Bootstd,
    ctx: &mut CmdContext,
    id: Option<&str>,
    method: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let Some(id) = id else {
        if method {
            ctx.method = None;
        } else {
            ctx.medium = None;
        }
        return Ok(());
    };

    let found = if method {
        std.methods.resolve(id)
    } else {
        std.media.resolve(id)
    };
    match found {
        Some(seq) if method => ctx.method = Some(seq),
        Some(seq) => ctx.medium = Some(seq),
        None => {
            writeln!(out, "Cannot find '{}'", id)?;
            return Err(BootError::NotFound);
        }
    }
    Ok(())
}

fn count_bootflows(std: &mut Bootstd, opts: ScanOptions) -> (usize, usize) {
    let mut total = 0;
    let mut valid = 0;
    for item in std.scan(opts) {
        match item {
            Ok(bflow) => {
                total += 1;
                if bflow.is_valid() {
                    valid += 1;
                }
            }
            Err(e) if e.bootflow.is_some() => total += 1,
            Err(_) => {}
        }
    }
    (total, valid)
}

fn info(std: &mut Bootstd, ctx: &CmdContext, out: &mut dyn Write) -> Result<()> {
    if ctx.medium.is_none() && ctx.method.is_none() {
        writeln!(out, "Please use 'select' first")?;
        return Err(BootError::NotReady);
    }

    if let Some(seq) = ctx.medium {
        let opts = ScanOptions {
            flags: ScanFlags::ALL,
            medium: Some(seq),
            method: ctx.method,
        };
        let (total, valid) = count_bootflows(std, opts);
        let medium = std.media.get(seq).ok_or(BootError::NotFound)?;
        writeln!(out, "Name:      {}", medium.name())?;
        writeln!(out, "Sequence:  {}", medium.seq())?;
        writeln!(
            out,
            "Status:    {}",
            if medium.is_probed() { "Probed" } else { "-" }
        )?;
        writeln!(out, "Uclass:    {}", medium.uclass())?;
        writeln!(out, "Bootflows: {} ({} valid)", total, valid)?;
    }

    if let Some(seq) = ctx.method {
        let method = std.methods.get(seq).ok_or(BootError::NotFound)?;
        writeln!(out, "Method:    {}", method.name())?;
        writeln!(out, "Desc:      {}", method.description())?;
        writeln!(
            out,
            "Global:    {}",
            if method.is_global() { "yes" } else { "no" }
        )?;
        match std.state_desc(seq) {
            Ok(desc) => writeln!(out, "{}", desc)?,
            Err(BootError::Unsupported) => {}
            Err(e) => writeln!(out, "State:     {}", e)?,
        }
    }
    Ok(())
}

fn bootflows(std: &mut Bootstd, ctx: &CmdContext, all: bool, out: &mut dyn Write) -> Result<()> {
    if ctx.medium.is_none() && ctx.method.is_none() {
        writeln!(out, "Please use 'select' first")?;
        return Err(BootError::NotReady);
    }

    let mut flags = ScanFlags::empty();
    if all {
        flags |= ScanFlags::ALL;
    }
    let opts = ScanOptions {
        flags,
        medium: ctx.medium,
        method: ctx.method,
    };

    writeln!(out, "Seq  Method       State   Part  Name                      Filename")?;
    writeln!(out, "---  -----------  ------  ----  ------------------------  ----------------")?;
    let mut rows = alloc::vec::Vec::new();
    for item in std.scan(opts) {
        match item {
            Ok(bflow) => rows.push(bflow),
            Err(e) => match e.bootflow {
                Some(bflow) => rows.push(bflow),
                None => writeln!(out, "     ** {}", e)?,
            },
        }
    }

    let mut valid = 0;
    for (i, bflow) in rows.iter().enumerate() {
        let method = std.methods.get(bflow.method).map(|m| m.name()).unwrap_or("?");
        let state = match bflow.err() {
            Some(e) => e.name(),
            None => bflow.state().name(),
        };
        if bflow.is_valid() {
            valid += 1;
        }
        writeln!(
            out,
            "{:3x}  {:<11.11}  {:<6}  {:>4x}  {:<24.24}  {}",
            i, method, state, bflow.part, bflow.name, bflow.fname
        )?;
    }
    writeln!(out, "---  -----------  ------  ----  ------------------------  ----------------")?;
    writeln!(out, "({} bootflows, {} valid)", rows.len(), valid)?;
    Ok(())
}
