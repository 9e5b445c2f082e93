use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use lundo_core::WidgetView;
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::ChatChanged => {}
    }
    // Every event re-reads the store so the next frame is current
    app.refresh();
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any view
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.widget.view(&app.chat) {
        WidgetView::Hidden => {
            if key.code == KeyCode::Char('q') {
                app.should_quit = true;
            }
        }
        WidgetView::Launcher => handle_launcher(app, key),
        WidgetView::Panel(_) if ctrl => handle_panel_command(app, key),
        WidgetView::Panel(_) => handle_panel_input(app, key),
    }
}

fn handle_launcher(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('o') | KeyCode::Char(' ') => {
            app.widget.activate_launcher();
            app.scroll_to_bottom();
        }
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

fn handle_panel_command(app: &mut App, key: KeyEvent) {
    let editable = app.widget.input_enabled(&app.chat);
    match key.code {
        KeyCode::Char('l') => app.clear_chat(),
        KeyCode::Char('r') => app.retry_health(),
        KeyCode::Char('t') => app.toggle_mode(),
        KeyCode::Char('a') if editable => app.widget.move_home(),
        KeyCode::Char('e') if editable => app.widget.move_end(),
        KeyCode::Char('u') => app.scroll_up(app.chat_height / 2),
        KeyCode::Char('d') => app.scroll_down(app.chat_height / 2),
        _ => {}
    }
}

fn handle_panel_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.widget.close(),
        KeyCode::Enter => app.submit(),

        // Message history
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),

        // The whole input is locked while loading or not ready
        KeyCode::Char(_)
        | KeyCode::Backspace
        | KeyCode::Delete
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Home
        | KeyCode::End
            if !app.widget.input_enabled(&app.chat) => {}

        // Input editing
        KeyCode::Char(c) => app.widget.insert_char(c),
        KeyCode::Backspace => app.widget.backspace(),
        KeyCode::Delete => app.widget.delete(),
        KeyCode::Left => app.widget.move_left(),
        KeyCode::Right => app.widget.move_right(),
        KeyCode::Home => app.widget.move_home(),
        KeyCode::End => app.widget.move_end(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}
