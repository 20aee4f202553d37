use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use connect4_solver::{bitboard::Stone, BitBoard, HEIGHT, WIDTH};

/// Draws a position to stdout, top row first, with the first player's
/// stones in red and the second player's in yellow
pub fn display(board: &BitBoard) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (1..=WIDTH).map(|x| x.to_string()).collect();
    stdout.queue(PrintStyledContent(style(cols + "\n")))?;

    for row in (0..HEIGHT).rev() {
        for column in 0..WIDTH {
            stdout.queue(PrintStyledContent(
                style("O")
                    .attribute(Attribute::Bold)
                    .on(Color::DarkBlue)
                    .with(match board.cell(column, row) {
                        Some(Stone::First) => Color::Red,
                        Some(Stone::Second) => Color::Yellow,
                        None => Color::DarkBlue,
                    }),
            ))?;
        }
        stdout.queue(PrintStyledContent(style("\n")))?;
    }

    let to_move = if board.num_moves() % 2 == 0 { 1 } else { 2 };
    stdout.queue(PrintStyledContent(style(format!(
        "{} moves played, player {} to move\n",
        board.num_moves(),
        to_move
    ))))?;
    stdout.flush()?;
    Ok(())
}
