// Plain-text rendering of a grid frame

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use gridkit_engine::column::Align;
use gridkit_engine::grid::{FrameBody, FrameRow, GridFrame};
use gridkit_engine::sort::SortDirection;

/// Widest a rendered column may get, in terminal cells
pub const MAX_CELL_WIDTH: usize = 40;

/// Cut `s` to `width` terminal cells, marking the cut with "..".
pub(crate) fn clip(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return s.to_string();
    }
    let budget = width.saturating_sub(2);
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    if width >= 2 {
        out.push_str("..");
    }
    out
}

fn pad(s: &str, width: usize, align: Align) -> String {
    let s = clip(s, width);
    let fill = width.saturating_sub(UnicodeWidthStr::width(s.as_str()));
    match align {
        Align::Left => format!("{}{}", s, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), s),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), s, " ".repeat(fill - left))
        }
    }
}

/// Cells are single-line; embedded newlines would break the layout.
fn flatten(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

fn header_text(label: &str, sort: Option<(SortDirection, usize)>, multi: bool) -> String {
    match sort {
        None => label.to_string(),
        Some((dir, priority)) => {
            let arrow = match dir {
                SortDirection::Asc => "^",
                SortDirection::Desc => "v",
            };
            if multi {
                format!("{} {}{}", label, arrow, priority)
            } else {
                format!("{} {}", label, arrow)
            }
        }
    }
}

/// Render `frame` as an aligned table. At most `limit` data rows are printed.
pub fn render(frame: &GridFrame, limit: Option<usize>) -> String {
    let multi = frame.headers.iter().filter(|h| h.sort.is_some()).count() > 1;
    let headers: Vec<String> = frame
        .headers
        .iter()
        .map(|h| header_text(&h.label, h.sort, multi))
        .collect();

    let mut budget = limit.unwrap_or(usize::MAX);
    let mut take = |rows: &[FrameRow]| -> Vec<Vec<String>> {
        let n = rows.len().min(budget);
        budget -= n;
        rows[..n]
            .iter()
            .map(|r| r.cells.iter().map(|c| flatten(c)).collect())
            .collect()
    };

    // (group heading, rows beneath it)
    let sections: Vec<(Option<String>, Vec<Vec<String>>)> = match &frame.body {
        FrameBody::Flat(rows) => vec![(None, take(rows))],
        FrameBody::Grouped(groups) => groups
            .iter()
            .map(|g| {
                let marker = if g.collapsed { "[+]" } else { "[-]" };
                let heading = format!("{} {} ({})", marker, g.label, g.count);
                (Some(heading), take(&g.rows))
            })
            .collect(),
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| UnicodeWidthStr::width(h.as_str())).collect();
    for (_, rows) in &sections {
        for row in rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(UnicodeWidthStr::width(cell.as_str()));
            }
        }
    }
    for w in &mut widths {
        *w = (*w).min(MAX_CELL_WIDTH);
    }

    let line = |cells: &[String]| -> String {
        let parts: Vec<String> = cells
            .iter()
            .zip(&widths)
            .zip(&frame.headers)
            .map(|((c, &w), h)| pad(c, w, h.align))
            .collect();
        parts.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&headers));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    let mut shown = 0;
    for (heading, rows) in &sections {
        if let Some(heading) = heading {
            out.push_str(heading);
            out.push('\n');
        }
        for row in rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        shown += rows.len();
    }

    if shown < frame.row_count && limit.is_some_and(|l| shown >= l) {
        out.push_str(&format!("({} of {} rows)\n", shown, frame.row_count));
    } else {
        out.push_str(&format!("({} rows)\n", frame.row_count));
    }
    out
}
