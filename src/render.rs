use crossterm::{
    QueueableCommand,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::Write;

use telnet_automata::OptionRegistry;
use telnet_automata::automaton::TransitionTable;
use telnet_automata::negotiation::{
    Decision, NegotiationSymbol, OptionState, OptionTable, reply_for, violation_for,
};

#[derive(Debug, Clone)]
pub struct BoxGlyphs {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
    pub cross: char,
}

impl BoxGlyphs {
    pub fn ascii() -> Self {
        Self {
            top_left: '+',
            top_right: '+',
            bottom_left: '+',
            bottom_right: '+',
            horizontal: '-',
            vertical: '|',
            cross: '+',
        }
    }
}

/// One table row; `color` tints the cell text only
#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<String>,
    pub color: Option<Color>,
}

impl Row {
    pub fn plain(cells: Vec<String>) -> Self {
        Self { cells, color: None }
    }
}

/// Renders ASCII boxed tables, telnet and pipe safe
#[derive(Debug, Clone)]
pub struct TableRenderer {
    glyphs: BoxGlyphs,
    border_color: Option<Color>,
    use_colors: bool,
}

impl TableRenderer {
    pub fn new(use_colors: bool) -> Self {
        Self {
            glyphs: BoxGlyphs::ascii(),
            border_color: Some(Color::Cyan),
            use_colors,
        }
    }

    fn tint<W: Write>(&self, writer: &mut W, color: Option<Color>) -> std::io::Result<bool> {
        match color {
            Some(c) if self.use_colors => {
                writer.queue(SetForegroundColor(c))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn untint<W: Write>(&self, writer: &mut W, tinted: bool) -> std::io::Result<()> {
        if tinted {
            writer.queue(ResetColor)?;
        }
        Ok(())
    }

    /// Top border with a centred title
    pub fn render_title<W: Write>(
        &self,
        writer: &mut W,
        title: &str,
        width: usize,
    ) -> std::io::Result<()> {
        let tinted = self.tint(writer, self.border_color)?;

        let title_len = title.chars().count();
        let padding = if width > title_len + 4 {
            (width - title_len - 4) / 2
        } else {
            0
        };

        writer.queue(Print(self.glyphs.top_left))?;
        for _ in 0..padding {
            writer.queue(Print(self.glyphs.horizontal))?;
        }
        writer.queue(Print(format!(" {} ", title)))?;
        let remaining = width.saturating_sub(2 + padding + title_len + 2);
        for _ in 0..remaining {
            writer.queue(Print(self.glyphs.horizontal))?;
        }
        writer.queue(Print(self.glyphs.top_right))?;
        writer.queue(Print('\n'))?;

        self.untint(writer, tinted)
    }

    /// A row of cells, each padded to its column width
    pub fn render_row<W: Write>(
        &self,
        writer: &mut W,
        row: &Row,
        widths: &[usize],
    ) -> std::io::Result<()> {
        for (i, width) in widths.iter().enumerate() {
            let tinted = self.tint(writer, self.border_color)?;
            writer.queue(Print(self.glyphs.vertical))?;
            self.untint(writer, tinted)?;

            let cell = row.cells.get(i).map(String::as_str).unwrap_or("");
            let tinted = self.tint(writer, row.color)?;
            writer.queue(Print(format!(" {:<width$} ", cell, width = width)))?;
            self.untint(writer, tinted)?;
        }

        let tinted = self.tint(writer, self.border_color)?;
        writer.queue(Print(self.glyphs.vertical))?;
        writer.queue(Print('\n'))?;
        self.untint(writer, tinted)
    }

    /// Separator with a cross at every column boundary
    pub fn render_separator<W: Write>(
        &self,
        writer: &mut W,
        widths: &[usize],
    ) -> std::io::Result<()> {
        let tinted = self.tint(writer, self.border_color)?;

        writer.queue(Print(self.glyphs.cross))?;
        for width in widths {
            for _ in 0..width + 2 {
                writer.queue(Print(self.glyphs.horizontal))?;
            }
            writer.queue(Print(self.glyphs.cross))?;
        }
        writer.queue(Print('\n'))?;

        self.untint(writer, tinted)
    }

    pub fn render_bottom<W: Write>(&self, writer: &mut W, width: usize) -> std::io::Result<()> {
        let tinted = self.tint(writer, self.border_color)?;

        writer.queue(Print(self.glyphs.bottom_left))?;
        for _ in 0..width.saturating_sub(2) {
            writer.queue(Print(self.glyphs.horizontal))?;
        }
        writer.queue(Print(self.glyphs.bottom_right))?;
        writer.queue(Print('\n'))?;

        self.untint(writer, tinted)
    }

    /// Render a complete table: title, header, separator, rows, bottom
    pub fn render_table<W: Write>(
        &self,
        writer: &mut W,
        title: &str,
        headers: &[&str],
        rows: &[Row],
    ) -> std::io::Result<()> {
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                rows.iter()
                    .filter_map(|row| row.cells.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let width = 1 + widths.iter().map(|w| w + 3).sum::<usize>();

        self.render_title(writer, title, width)?;
        let header = Row::plain(headers.iter().map(|h| h.to_string()).collect());
        self.render_row(writer, &header, &widths)?;
        self.render_separator(writer, &widths)?;
        for row in rows {
            self.render_row(writer, row, &widths)?;
        }
        self.render_bottom(writer, width)?;

        writer.flush()
    }
}

/// Every cell of the Q method table under `policy`, one row per
/// (state, symbol) pair
pub fn negotiation_rows(policy: Decision) -> Vec<Row> {
    let table = OptionTable { policy };
    let mut rows = Vec::with_capacity(OptionState::ALL.len() * NegotiationSymbol::ALL.len());

    for from in OptionState::ALL {
        for symbol in NegotiationSymbol::ALL {
            let to = table.transition(from, symbol).unwrap_or(OptionState::No);
            let reply = reply_for(from, symbol, to);
            let violation = violation_for(from, symbol);

            let color = if violation.is_some() {
                Some(Color::Red)
            } else if reply.is_some() {
                Some(Color::Green)
            } else {
                None
            };

            rows.push(Row {
                cells: vec![
                    format!("{:?}", from),
                    format!("{:?}", symbol),
                    format!("{:?}", to),
                    reply.map(|r| format!("{:?}", r)).unwrap_or_default(),
                    violation.unwrap_or("").to_string(),
                ],
                color,
            });
        }
    }

    rows
}

pub fn render_negotiation_table<W: Write>(
    renderer: &TableRenderer,
    writer: &mut W,
    policy: Decision,
) -> std::io::Result<()> {
    let title = match policy {
        Decision::Accept => "Q Method (unsolicited offers accepted)",
        Decision::Refuse => "Q Method (unsolicited offers refused)",
    };
    renderer.render_table(
        writer,
        title,
        &["From", "Symbol", "To", "Reply", "Violation"],
        &negotiation_rows(policy),
    )
}

pub fn render_registry<W: Write>(
    renderer: &TableRenderer,
    writer: &mut W,
    registry: &OptionRegistry,
) -> std::io::Result<()> {
    let answer = |decision: Decision| match decision {
        Decision::Accept => "accept".to_string(),
        Decision::Refuse => "refuse".to_string(),
    };
    let rows: Vec<Row> = registry
        .iter()
        .map(|policy| {
            Row::plain(vec![
                policy.identity.code.to_string(),
                policy.identity.name.to_string(),
                answer(policy.remote),
                answer(policy.local),
            ])
        })
        .collect();

    renderer.render_table(
        writer,
        "Negotiated Options",
        &["Code", "Option", "Their WILL", "Their DO"],
        &rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_table_layout() {
        let renderer = TableRenderer::new(false);
        let rows = vec![Row::plain(vec!["1".into(), "echo".into()])];
        let text = render(|w| renderer.render_table(w, "T", &["Code", "Name"], &rows));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "| Code | Name |");
        assert_eq!(lines[2], "+------+------+");
        assert_eq!(lines[3], "| 1    | echo |");
        assert_eq!(lines[4], "+-------------+");
        assert!(lines.iter().all(|line| line.chars().count() == 15));
    }

    #[test]
    fn test_negotiation_rows_cover_table() {
        let rows = negotiation_rows(Decision::Accept);
        assert_eq!(rows.len(), 24);

        let no_offer = &rows[1];
        assert_eq!(no_offer.cells[..4], ["No", "OfferPositive", "Yes", "Accept"]);
        assert_eq!(no_offer.color, Some(Color::Green));

        let refused = &negotiation_rows(Decision::Refuse)[1];
        assert_eq!(refused.cells[2], "No");
        assert_eq!(refused.cells[3], "Refuse");

        let errors = rows.iter().filter(|row| row.color == Some(Color::Red)).count();
        assert_eq!(errors, 8);
    }

    #[test]
    fn test_registry_rendering() {
        let renderer = TableRenderer::new(false);
        let text = render(|w| render_registry(&renderer, w, &OptionRegistry::default()));
        assert!(text.contains("| 1    | echo"));
        assert!(text.contains("terminal type"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_colors_only_when_enabled() {
        let renderer = TableRenderer::new(true);
        let text = render(|w| render_negotiation_table(&renderer, w, Decision::Accept));
        assert!(text.contains('\u{1b}'));
    }
}
