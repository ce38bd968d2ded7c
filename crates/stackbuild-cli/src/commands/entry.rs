use super::{print_json, EXIT_NOT_FOUND};
use crate::Context;
use miette::Result;
use serde::Serialize;
use stackbuild_core::build::discover_entry_point;
use std::path::PathBuf;

#[derive(Serialize)]
struct EntryOutput<'a> {
    ok: bool,
    project: &'a str,
    entry: Option<&'a str>,
}

pub fn run(ctx: &Context, project: Option<&PathBuf>) -> Result<()> {
    let project = ctx.dir_or_cwd(project);
    let fs = ctx.fs();
    let entry = discover_entry_point(fs.as_ref(), &project);

    if ctx.json {
        print_json(&EntryOutput {
            ok: entry.is_some(),
            project: &project,
            entry: entry.as_deref(),
        })?;
    } else {
        match &entry {
            Some(name) => println!("{name}"),
            None => eprintln!("no entry file in {project}"),
        }
    }

    if entry.is_none() {
        std::process::exit(EXIT_NOT_FOUND);
    }
    Ok(())
}
