use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::models::{ActionItem, Member, MemberDraft, MemberPatch, Mood, Note, NoteDraft, NotePatch};
use crate::state::{MemberRoster, NoteLog};
use crate::store::NoteStore;
use crate::summary::TeamSummary;

struct MemberForm {
    editing: Option<String>,
    name: String,
    role: String,
    birthday: String,
    hiring_date: String,
    location: String,
    active: usize,
    error: Option<String>,
}

impl MemberForm {
    const FIELDS: usize = 5;

    fn blank() -> Self {
        Self {
            editing: None,
            name: String::new(),
            role: String::new(),
            birthday: String::new(),
            hiring_date: String::new(),
            location: String::new(),
            active: 0,
            error: None,
        }
    }

    fn edit(member: &Member) -> Self {
        Self {
            editing: Some(member.id.clone()),
            name: member.name.clone(),
            role: member.role.clone(),
            birthday: member.birthday.to_string(),
            hiring_date: member.hiring_date.to_string(),
            location: member.location.clone(),
            active: 0,
            error: None,
        }
    }

    fn buffer(&mut self) -> &mut String {
        match self.active {
            0 => &mut self.name,
            1 => &mut self.role,
            2 => &mut self.birthday,
            3 => &mut self.hiring_date,
            _ => &mut self.location,
        }
    }

    fn next_field(&mut self) {
        self.active = (self.active + 1) % Self::FIELDS;
    }

    fn prev_field(&mut self) {
        self.active = (self.active + Self::FIELDS - 1) % Self::FIELDS;
    }
}

struct NoteForm {
    editing: Option<String>,
    date: String,
    talking_points: String,
    mood: usize,
    flag: bool,
    flag_description: String,
    action_items: String,
    active: usize,
    error: Option<String>,
}

impl NoteForm {
    const FIELDS: usize = 6;
    const DATE: usize = 0;
    const TALKING_POINTS: usize = 1;
    const MOOD: usize = 2;
    const FLAG: usize = 3;
    const FLAG_DESCRIPTION: usize = 4;
    const ACTION_ITEMS: usize = 5;

    fn blank() -> Self {
        Self {
            editing: None,
            date: chrono::Local::now().date_naive().to_string(),
            talking_points: String::new(),
            mood: 0,
            flag: false,
            flag_description: String::new(),
            action_items: String::new(),
            active: 0,
            error: None,
        }
    }

    fn edit(note: &Note) -> Self {
        Self {
            editing: Some(note.id.clone()),
            date: note.date.to_string(),
            talking_points: note.talking_points.clone(),
            mood: Mood::ALL.iter().position(|m| *m == note.mood).unwrap_or(0),
            flag: note.flag,
            flag_description: note.flag_description.clone().unwrap_or_default(),
            action_items: render_action_items(&note.action_items),
            active: 0,
            error: None,
        }
    }

    fn mood(&self) -> Mood {
        Mood::ALL[self.mood]
    }

    fn is_text_field(&self) -> bool {
        !matches!(self.active, Self::MOOD | Self::FLAG)
    }

    fn is_multiline_field(&self) -> bool {
        matches!(self.active, Self::TALKING_POINTS | Self::ACTION_ITEMS)
    }

    fn buffer(&mut self) -> &mut String {
        match self.active {
            Self::DATE => &mut self.date,
            Self::TALKING_POINTS => &mut self.talking_points,
            Self::FLAG_DESCRIPTION => &mut self.flag_description,
            _ => &mut self.action_items,
        }
    }

    // The flag-description field only exists while the flag is set.
    fn next_field(&mut self) {
        self.active = (self.active + 1) % Self::FIELDS;
        if self.active == Self::FLAG_DESCRIPTION && !self.flag {
            self.active = Self::ACTION_ITEMS;
        }
    }

    fn prev_field(&mut self) {
        self.active = (self.active + Self::FIELDS - 1) % Self::FIELDS;
        if self.active == Self::FLAG_DESCRIPTION && !self.flag {
            self.active = Self::FLAG;
        }
    }

    fn cycle_mood(&mut self, forward: bool) {
        let len = Mood::ALL.len();
        self.mood = if forward {
            (self.mood + 1) % len
        } else {
            (self.mood + len - 1) % len
        };
    }
}

enum PendingAction {
    DeleteMember(String),
    DeleteNote(String),
    ResolveFlag(String),
}

struct Confirm {
    action: PendingAction,
    message: String,
}

enum Mode {
    Browse,
    MemberForm(MemberForm),
    NoteForm(NoteForm),
    Confirm(Confirm),
}

enum Screen {
    Roster,
    Member { log: NoteLog, selected: usize },
}

struct App {
    screen: Screen,
    mode: Mode,
    roster_selected: usize,
    scroll_offset: u16,
    summary: TeamSummary,
    note_store: Arc<dyn NoteStore>,
    status: Option<String>,
}

impl App {
    fn new(note_store: Arc<dyn NoteStore>) -> Self {
        Self {
            screen: Screen::Roster,
            mode: Mode::Browse,
            roster_selected: 0,
            scroll_offset: 0,
            summary: TeamSummary::new(Arc::clone(&note_store)),
            note_store,
            status: None,
        }
    }

    fn selected_index(&self) -> usize {
        match &self.screen {
            Screen::Roster => self.roster_selected,
            Screen::Member { selected, .. } => *selected,
        }
    }
}

fn refresh_summary(rt: &Runtime, summary: &mut TeamSummary, roster: &MemberRoster) {
    let ids: Vec<String> = roster.members().iter().map(|m| m.id.clone()).collect();
    rt.block_on(summary.refresh(&ids));
}

pub fn run(rt: &Runtime, roster: &mut MemberRoster, note_store: Arc<dyn NoteStore>) -> Result<()> {
    rt.block_on(roster.refresh());

    let mut app = App::new(note_store);
    refresh_summary(rt, &mut app.summary, roster);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut app, roster, rt);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    roster: &mut MemberRoster,
    rt: &Runtime,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, app, roster, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !handle_key(app, roster, rt, key.code, key.modifiers) {
                break;
            }
            list_state.select(Some(app.selected_index()));
        }
    }
    Ok(())
}

/// Returns false when the app should quit.
fn handle_key(
    app: &mut App,
    roster: &mut MemberRoster,
    rt: &Runtime,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> bool {
    app.status = None;

    let mode = std::mem::replace(&mut app.mode, Mode::Browse);
    match mode {
        Mode::Browse => return handle_browse_key(app, roster, rt, code),
        Mode::MemberForm(form) => handle_member_form_key(app, roster, rt, form, code, modifiers),
        Mode::NoteForm(form) => handle_note_form_key(app, rt, form, code, modifiers),
        Mode::Confirm(confirm) => handle_confirm_key(app, roster, rt, confirm, code),
    }
    true
}

fn handle_browse_key(app: &mut App, roster: &mut MemberRoster, rt: &Runtime, code: KeyCode) -> bool {
    match app.screen {
        Screen::Roster => handle_roster_key(app, roster, rt, code),
        Screen::Member { .. } => handle_member_page_key(app, roster, rt, code),
    }
}

fn handle_roster_key(app: &mut App, roster: &mut MemberRoster, rt: &Runtime, code: KeyCode) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Down | KeyCode::Char('j') => {
            let len = roster.members().len();
            if len > 0 && app.roster_selected < len - 1 {
                app.roster_selected += 1;
                app.scroll_offset = 0;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if app.roster_selected > 0 {
                app.roster_selected -= 1;
                app.scroll_offset = 0;
            }
        }
        KeyCode::Char('J') | KeyCode::PageDown => {
            app.scroll_offset = app.scroll_offset.saturating_add(3);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            app.scroll_offset = app.scroll_offset.saturating_sub(3);
        }
        KeyCode::Enter => {
            if let Some(member) = roster.members().get(app.roster_selected) {
                let mut log = NoteLog::new(Arc::clone(&app.note_store), member.id.clone());
                rt.block_on(log.refresh());
                app.screen = Screen::Member { log, selected: 0 };
                app.scroll_offset = 0;
            }
        }
        KeyCode::Char('a') => app.mode = Mode::MemberForm(MemberForm::blank()),
        KeyCode::Char('e') => {
            if let Some(member) = roster.members().get(app.roster_selected) {
                app.mode = Mode::MemberForm(MemberForm::edit(member));
            }
        }
        KeyCode::Char('d') => {
            if let Some(member) = roster.members().get(app.roster_selected) {
                app.mode = Mode::Confirm(Confirm {
                    action: PendingAction::DeleteMember(member.id.clone()),
                    message: format!("Delete {}? Their one-on-one notes are kept.", member.name),
                });
            }
        }
        KeyCode::Char('r') => {
            rt.block_on(roster.refresh());
            refresh_summary(rt, &mut app.summary, roster);
            let len = roster.members().len();
            app.roster_selected = app.roster_selected.min(len.saturating_sub(1));
        }
        _ => {}
    }
    true
}

fn handle_member_page_key(
    app: &mut App,
    roster: &mut MemberRoster,
    rt: &Runtime,
    code: KeyCode,
) -> bool {
    if code == KeyCode::Char('q') {
        return false;
    }
    if code == KeyCode::Esc {
        // leaving the page discards its note log; badges may have changed
        app.screen = Screen::Roster;
        app.scroll_offset = 0;
        refresh_summary(rt, &mut app.summary, roster);
        return true;
    }

    let Screen::Member { log, selected } = &mut app.screen else {
        return true;
    };
    match code {
        KeyCode::Down | KeyCode::Char('j') => {
            let len = log.notes().len();
            if len > 0 && *selected < len - 1 {
                *selected += 1;
                app.scroll_offset = 0;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if *selected > 0 {
                *selected -= 1;
                app.scroll_offset = 0;
            }
        }
        KeyCode::Char('J') | KeyCode::PageDown => {
            app.scroll_offset = app.scroll_offset.saturating_add(3);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            app.scroll_offset = app.scroll_offset.saturating_sub(3);
        }
        KeyCode::Char('a') => app.mode = Mode::NoteForm(NoteForm::blank()),
        KeyCode::Char('e') => {
            if let Some(note) = log.notes().get(*selected) {
                app.mode = Mode::NoteForm(NoteForm::edit(note));
            }
        }
        KeyCode::Char('d') => {
            if let Some(note) = log.notes().get(*selected) {
                app.mode = Mode::Confirm(Confirm {
                    action: PendingAction::DeleteNote(note.id.clone()),
                    message: format!("Delete the note from {}?", note.date),
                });
            }
        }
        KeyCode::Char('f') => {
            if let Some(note) = log.notes().get(*selected) {
                if note.flag {
                    app.mode = Mode::Confirm(Confirm {
                        action: PendingAction::ResolveFlag(note.id.clone()),
                        message: format!("Resolve the flag on the note from {}?", note.date),
                    });
                }
            }
        }
        KeyCode::Char('r') => {
            rt.block_on(log.refresh());
            *selected = (*selected).min(log.notes().len().saturating_sub(1));
        }
        _ => {}
    }
    true
}

fn handle_member_form_key(
    app: &mut App,
    roster: &mut MemberRoster,
    rt: &Runtime,
    mut form: MemberForm,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    let submit = code == KeyCode::Enter
        || (code == KeyCode::Char('s') && modifiers.contains(KeyModifiers::CONTROL));

    if code == KeyCode::Esc {
        return; // cancel, back to browse
    }
    if submit {
        submit_member_form(app, roster, rt, form);
        return;
    }

    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Backspace => {
            form.buffer().pop();
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            form.buffer().push(c);
        }
        _ => {}
    }
    app.mode = Mode::MemberForm(form);
}

fn submit_member_form(app: &mut App, roster: &mut MemberRoster, rt: &Runtime, mut form: MemberForm) {
    let draft = match build_member_draft(&form) {
        Ok(draft) => draft,
        Err(msg) => {
            form.error = Some(msg);
            app.mode = Mode::MemberForm(form);
            return;
        }
    };

    let outcome = match &form.editing {
        Some(id) => rt.block_on(roster.update(id, MemberPatch::replace_all(&draft))),
        None => rt.block_on(roster.create(draft)).map(|_| ()),
    };

    match outcome {
        Ok(()) => {
            refresh_summary(rt, &mut app.summary, roster);
            let len = roster.members().len();
            app.roster_selected = app.roster_selected.min(len.saturating_sub(1));
        }
        Err(err) => {
            form.error = Some(format!("{err:#}"));
            app.mode = Mode::MemberForm(form);
        }
    }
}

fn handle_note_form_key(
    app: &mut App,
    rt: &Runtime,
    mut form: NoteForm,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    if code == KeyCode::Esc {
        return;
    }

    let ctrl_submit = code == KeyCode::Char('s') && modifiers.contains(KeyModifiers::CONTROL);
    // Enter submits, except in multi-line fields where it inserts a newline
    // and on the flag toggle.
    if ctrl_submit || (code == KeyCode::Enter && !form.is_multiline_field() && form.active != NoteForm::FLAG)
    {
        submit_note_form(app, rt, form);
        return;
    }

    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Enter => {
            if form.is_multiline_field() {
                form.buffer().push('\n');
            } else if form.active == NoteForm::FLAG {
                form.flag = !form.flag;
            }
        }
        KeyCode::Left => {
            if form.active == NoteForm::MOOD {
                form.cycle_mood(false);
            }
        }
        KeyCode::Right => {
            if form.active == NoteForm::MOOD {
                form.cycle_mood(true);
            }
        }
        KeyCode::Char(' ') if form.active == NoteForm::MOOD => form.cycle_mood(true),
        KeyCode::Char(' ') if form.active == NoteForm::FLAG => form.flag = !form.flag,
        KeyCode::Backspace => {
            if form.is_text_field() {
                form.buffer().pop();
            }
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            if form.is_text_field() {
                form.buffer().push(c);
            }
        }
        _ => {}
    }
    app.mode = Mode::NoteForm(form);
}

fn submit_note_form(app: &mut App, rt: &Runtime, mut form: NoteForm) {
    let Screen::Member { log, selected } = &mut app.screen else {
        return;
    };

    match &form.editing {
        Some(id) => {
            let patch = match build_note_patch(&form) {
                Ok(patch) => patch,
                Err(msg) => {
                    form.error = Some(msg);
                    app.mode = Mode::NoteForm(form);
                    return;
                }
            };
            if let Err(err) = rt.block_on(log.update(id, patch)) {
                form.error = Some(format!("{err:#}"));
                app.mode = Mode::NoteForm(form);
            }
        }
        None => {
            let draft = match build_note_draft(&form, log.member_id()) {
                Ok(draft) => draft,
                Err(msg) => {
                    form.error = Some(msg);
                    app.mode = Mode::NoteForm(form);
                    return;
                }
            };
            match rt.block_on(log.create(draft)) {
                Ok(_) => *selected = 0,
                Err(err) => {
                    form.error = Some(format!("{err:#}"));
                    app.mode = Mode::NoteForm(form);
                }
            }
        }
    }
}

fn handle_confirm_key(
    app: &mut App,
    roster: &mut MemberRoster,
    rt: &Runtime,
    confirm: Confirm,
    code: KeyCode,
) {
    match code {
        KeyCode::Char('y') | KeyCode::Enter => {}
        KeyCode::Char('n') | KeyCode::Esc => return,
        _ => {
            app.mode = Mode::Confirm(confirm);
            return;
        }
    }

    match confirm.action {
        PendingAction::DeleteMember(id) => match rt.block_on(roster.delete(&id)) {
            Ok(()) => {
                refresh_summary(rt, &mut app.summary, roster);
                let len = roster.members().len();
                app.roster_selected = app.roster_selected.min(len.saturating_sub(1));
            }
            Err(err) => app.status = Some(format!("{err:#}")),
        },
        PendingAction::DeleteNote(id) => {
            if let Screen::Member { log, selected } = &mut app.screen {
                match rt.block_on(log.delete(&id)) {
                    Ok(()) => *selected = (*selected).min(log.notes().len().saturating_sub(1)),
                    Err(err) => app.status = Some(format!("{err:#}")),
                }
            }
        }
        PendingAction::ResolveFlag(id) => {
            if let Screen::Member { log, .. } = &mut app.screen {
                if let Err(err) = rt.block_on(log.resolve_flag(&id)) {
                    app.status = Some(format!("{err:#}"));
                }
            }
        }
    }
}

// --- Form parsing ---

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid {field} (use YYYY-MM-DD)"))
}

fn build_member_draft(form: &MemberForm) -> Result<MemberDraft, String> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    let role = form.role.trim();
    if role.is_empty() {
        return Err("Role is required".to_string());
    }
    Ok(MemberDraft {
        name: name.to_string(),
        role: role.to_string(),
        birthday: parse_date(&form.birthday, "birthday")?,
        hiring_date: parse_date(&form.hiring_date, "hiring date")?,
        location: form.location.trim().to_string(),
    })
}

fn note_fields(form: &NoteForm) -> Result<(NaiveDate, String, Option<String>, Vec<ActionItem>), String> {
    let talking_points = form.talking_points.trim();
    if talking_points.is_empty() {
        return Err("Talking points are required".to_string());
    }
    let flag_description = if form.flag {
        let text = form.flag_description.trim();
        if text.is_empty() {
            return Err("Flag description is required when the flag is set".to_string());
        }
        Some(text.to_string())
    } else {
        None
    };
    Ok((
        parse_date(&form.date, "date")?,
        talking_points.to_string(),
        flag_description,
        parse_action_items(&form.action_items)?,
    ))
}

fn build_note_draft(form: &NoteForm, member_id: &str) -> Result<NoteDraft, String> {
    let (date, talking_points, flag_description, action_items) = note_fields(form)?;
    Ok(NoteDraft {
        member_id: member_id.to_string(),
        date,
        talking_points,
        mood: form.mood(),
        flag: form.flag,
        flag_description,
        action_items,
    })
}

/// The edit form replaces every field; unflagging clears the description.
fn build_note_patch(form: &NoteForm) -> Result<NotePatch, String> {
    let (date, talking_points, flag_description, action_items) = note_fields(form)?;
    Ok(NotePatch {
        date: Some(date),
        talking_points: Some(talking_points),
        mood: Some(form.mood()),
        flag: Some(form.flag),
        flag_description: Some(flag_description.unwrap_or_default()),
        action_items: Some(action_items),
    })
}

/// One action item per line: `description`, optionally `:: YYYY-MM-DD` for a
/// due date, optionally a leading `[x]` for already-done items. Shared with
/// the `notes add` subcommand.
pub(crate) fn parse_action_items(raw: &str) -> Result<Vec<ActionItem>, String> {
    let mut items = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (done, rest) = if let Some(rest) =
            line.strip_prefix("[x]").or_else(|| line.strip_prefix("[X]"))
        {
            (true, rest.trim_start())
        } else if let Some(rest) = line.strip_prefix("[ ]") {
            (false, rest.trim_start())
        } else {
            (false, line)
        };
        let (description, due_date) = match rest.split_once("::") {
            Some((desc, date)) => {
                let desc = desc.trim();
                let due = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
                    format!("Invalid due date in action item '{desc}' (use YYYY-MM-DD)")
                })?;
                (desc, Some(due))
            }
            None => (rest, None),
        };
        if description.is_empty() {
            continue;
        }
        items.push(ActionItem {
            description: description.to_string(),
            done,
            due_date,
        });
    }
    Ok(items)
}

fn render_action_items(items: &[ActionItem]) -> String {
    items
        .iter()
        .map(|item| {
            let marker = if item.done { "[x] " } else { "" };
            match item.due_date {
                Some(due) => format!("{marker}{} :: {due}", item.description),
                None => format!("{marker}{}", item.description),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// --- Drawing ---

fn draw(frame: &mut Frame, app: &App, roster: &MemberRoster, list_state: &mut ListState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(outer[0]);

    match &app.screen {
        Screen::Roster => draw_roster(frame, app, roster, list_state, &chunks),
        Screen::Member { log, selected } => {
            draw_member_page(frame, app, roster, log, *selected, list_state, &chunks);
        }
    }

    // Footer: last failure if any, key help otherwise
    let footer = if let Some(status) = &app.status {
        Paragraph::new(format!(" {status}")).style(Style::default().fg(Color::Red))
    } else {
        Paragraph::new(help_line(app)).style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(footer, outer[1]);

    match &app.mode {
        Mode::Browse => {}
        Mode::MemberForm(form) => draw_member_form(frame, form),
        Mode::NoteForm(form) => draw_note_form(frame, form),
        Mode::Confirm(confirm) => draw_confirm(frame, confirm),
    }
}

fn help_line(app: &App) -> &'static str {
    match (&app.mode, &app.screen) {
        (Mode::Browse, Screen::Roster) => {
            " j/k:navigate  Enter:open  a:add  e:edit  d:delete  r:refresh  q:quit"
        }
        (Mode::Browse, Screen::Member { .. }) => {
            " j/k:navigate  a:add  e:edit  d:delete  f:resolve flag  r:refresh  Esc:back  q:quit"
        }
        (Mode::Confirm(_), _) => " y:confirm  n:cancel",
        _ => " Tab:next field  Enter:submit (newline in text)  Ctrl+S:submit  Esc:cancel",
    }
}

fn draw_roster(
    frame: &mut Frame,
    app: &App,
    roster: &MemberRoster,
    list_state: &mut ListState,
    chunks: &[Rect],
) {
    // Left panel: member list
    if let Some(error) = roster.error() {
        let message = Paragraph::new(error.to_string())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" Team "))
            .wrap(Wrap { trim: false });
        frame.render_widget(message, chunks[0]);
    } else if roster.loading() {
        let message = Paragraph::new("Loading...")
            .block(Block::default().borders(Borders::ALL).title(" Team "));
        frame.render_widget(message, chunks[0]);
    } else if roster.members().is_empty() {
        let message = Paragraph::new("No members yet. Press 'a' to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Team "));
        frame.render_widget(message, chunks[0]);
    } else {
        let items: Vec<ListItem> = roster
            .members()
            .iter()
            .map(|member| {
                let flagged = app
                    .summary
                    .get(&member.id)
                    .map(|s| s.flagged_notes)
                    .unwrap_or(0);
                let badge = if flagged > 0 {
                    format!("  !{flagged}")
                } else {
                    String::new()
                };
                let name = truncate(&member.name, 24);
                ListItem::new(format!("{name}{badge}"))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Team ({}) ", roster.members().len())),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], list_state);
    }

    // Right panel: member detail + digest
    let detail = build_member_detail(app, roster);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Member "))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);
}

fn build_member_detail<'a>(app: &'a App, roster: &'a MemberRoster) -> Text<'a> {
    if roster.error().is_some() {
        return Text::raw("");
    }
    let Some(member) = roster.members().get(app.roster_selected) else {
        return Text::raw("No member selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        &member.name,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("Role: {}", member.role)));
    lines.push(Line::from(format!("Birthday: {}", member.birthday)));
    lines.push(Line::from(format!("Hired: {}", member.hiring_date)));
    lines.push(Line::from(format!("Location: {}", member.location)));
    lines.push(Line::from(""));

    match app.summary.get(&member.id) {
        Some(summary) => {
            let flags = Span::styled(
                format!("{} flagged", summary.flagged_notes),
                if summary.flagged_notes > 0 {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::DarkGray)
                },
            );
            lines.push(Line::from(vec![
                Span::raw(format!("Notes: {}  (", summary.total_notes)),
                flags,
                Span::raw(")"),
            ]));
            match summary.last_note_mood {
                Some(mood) => lines.push(Line::from(format!(
                    "Last mood: {} {}",
                    mood.glyph(),
                    mood.label()
                ))),
                None => lines.push(Line::from("Last mood: -")),
            }
        }
        None => lines.push(Line::from("Notes: -")),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter to open the one-on-one log",
        Style::default().fg(Color::DarkGray),
    )));

    Text::from(lines)
}

fn draw_member_page(
    frame: &mut Frame,
    app: &App,
    roster: &MemberRoster,
    log: &NoteLog,
    selected: usize,
    list_state: &mut ListState,
    chunks: &[Rect],
) {
    let member_name = roster
        .find(log.member_id())
        .map(|m| m.name.as_str())
        .unwrap_or(log.member_id());

    // Left panel: note list, newest first
    if let Some(error) = log.error() {
        let message = Paragraph::new(error.to_string())
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {member_name} ")),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(message, chunks[0]);
    } else if log.loading() {
        let message = Paragraph::new("Loading...").block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {member_name} ")),
        );
        frame.render_widget(message, chunks[0]);
    } else if log.notes().is_empty() {
        let message = Paragraph::new("No notes yet. Press 'a' to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {member_name} ")),
            );
        frame.render_widget(message, chunks[0]);
    } else {
        let items: Vec<ListItem> = log
            .notes()
            .iter()
            .map(|note| {
                let flag = if note.flag { "  FLAG" } else { "" };
                ListItem::new(format!("{} {}{}", note.date, note.mood.glyph(), flag))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {member_name} ({}) ", log.notes().len())),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], list_state);
    }

    // Right panel: note detail
    let detail = build_note_detail(log, selected);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Note "))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);
}

fn build_note_detail(log: &NoteLog, selected: usize) -> Text<'_> {
    if log.error().is_some() {
        return Text::raw("");
    }
    let Some(note) = log.notes().get(selected) else {
        return Text::raw("No note selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!("{}  {} {}", note.date, note.mood.glyph(), note.mood.label()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if note.flag {
        let reason = note.flag_description.as_deref().unwrap_or("");
        lines.push(Line::from(Span::styled(
            format!("FLAG: {reason}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "Talking Points",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for line in textwrap::fill(&note.talking_points, 70).lines() {
        lines.push(Line::from(format!("  {line}")));
    }
    lines.push(Line::from(""));

    if !note.action_items.is_empty() {
        lines.push(Line::from(Span::styled(
            "Action Items",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for item in &note.action_items {
            let marker = if item.done { "[x]" } else { "[ ]" };
            let due = match item.due_date {
                Some(due) => format!("  (due {due})"),
                None => String::new(),
            };
            lines.push(Line::from(format!("  {marker} {}{due}", item.description)));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        format!("Recorded {}", note.created_at.format("%Y-%m-%d %H:%M UTC")),
        Style::default().fg(Color::DarkGray),
    )));

    Text::from(lines)
}

fn field_line<'a>(label: &'a str, value: String, active: bool) -> Line<'a> {
    let marker = if active { "> " } else { "  " };
    let style = if active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(Span::styled(format!("{marker}{label}: {value}"), style))
}

fn push_multiline(lines: &mut Vec<Line>, label: &str, value: &str, active: bool) {
    let marker = if active { "> " } else { "  " };
    let style = if active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    lines.push(Line::from(Span::styled(
        format!("{marker}{label}:"),
        style,
    )));
    for line in value.lines() {
        lines.push(Line::from(Span::styled(format!("      {line}"), style)));
    }
    if active {
        lines.push(Line::from(Span::styled("      _".to_string(), style)));
    }
}

fn draw_member_form(frame: &mut Frame, form: &MemberForm) {
    let title = if form.editing.is_some() {
        " Edit Member "
    } else {
        " Add Member "
    };
    let area = centered_rect(60, 60, frame.area());

    let mut lines = vec![
        field_line("Name", form.name.clone(), form.active == 0),
        field_line("Role", form.role.clone(), form.active == 1),
        field_line("Birthday (YYYY-MM-DD)", form.birthday.clone(), form.active == 2),
        field_line(
            "Hiring date (YYYY-MM-DD)",
            form.hiring_date.clone(),
            form.active == 3,
        ),
        field_line("Location", form.location.clone(), form.active == 4),
    ];
    if let Some(error) = &form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Clear, area);
    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_note_form(frame: &mut Frame, form: &NoteForm) {
    let title = if form.editing.is_some() {
        " Edit Note "
    } else {
        " Add Note "
    };
    let area = centered_rect(70, 80, frame.area());

    let mood = form.mood();
    let mut lines = Vec::new();
    lines.push(field_line(
        "Date (YYYY-MM-DD)",
        form.date.clone(),
        form.active == NoteForm::DATE,
    ));
    push_multiline(
        &mut lines,
        "Talking points",
        &form.talking_points,
        form.active == NoteForm::TALKING_POINTS,
    );
    lines.push(field_line(
        "Mood (Space to change)",
        format!("{} {}", mood.glyph(), mood.label()),
        form.active == NoteForm::MOOD,
    ));
    lines.push(field_line(
        "Flag (Space to toggle)",
        if form.flag { "[x]" } else { "[ ]" }.to_string(),
        form.active == NoteForm::FLAG,
    ));
    if form.flag {
        lines.push(field_line(
            "Flag description",
            form.flag_description.clone(),
            form.active == NoteForm::FLAG_DESCRIPTION,
        ));
    }
    push_multiline(
        &mut lines,
        "Action items (one per line, ':: YYYY-MM-DD' for a due date)",
        &form.action_items,
        form.active == NoteForm::ACTION_ITEMS,
    );
    if let Some(error) = &form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Clear, area);
    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_confirm(frame: &mut Frame, confirm: &Confirm) {
    let area = centered_rect(50, 20, frame.area());
    let lines = vec![
        Line::from(confirm.message.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "y: confirm    n: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Confirm "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}
