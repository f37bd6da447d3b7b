//! List command implementation

use esphost_board::available_boards;

/// List all boards compiled in
pub fn list_boards() {
    println!("Available boards:");
    println!();
    for board in available_boards() {
        if board.aliases.is_empty() {
            println!("  {:<8} - {}", board.name, board.description);
        } else {
            println!(
                "  {:<8} - {} (aliases: {})",
                board.name,
                board.description,
                board.aliases.join(", ")
            );
        }
    }
}
