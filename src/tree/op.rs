/// Instruction carried by a tree node.
///
/// The first three variants are nonterminals that steer control flow, the
/// remaining three are the ant's primitive actions and always sit at the leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    // --- Sequencing & Control Flow ---
    Prog3,
    Prog2,
    IfFoodAhead,

    // --- Primitive Actions ---
    MoveForward,
    TurnLeft,
    TurnRight,
}

impl OpType {
    pub const NONTERMINALS: [OpType; 3] = [OpType::Prog3, OpType::Prog2, OpType::IfFoodAhead];
    pub const TERMINALS: [OpType; 3] = [OpType::MoveForward, OpType::TurnLeft, OpType::TurnRight];
    pub const ALL: [OpType; 6] = [
        OpType::Prog3,
        OpType::Prog2,
        OpType::IfFoodAhead,
        OpType::MoveForward,
        OpType::TurnLeft,
        OpType::TurnRight,
    ];

    /// Number of children a node with this operator must own.
    pub fn arity(self) -> usize {
        match self {
            OpType::Prog3 => 3,
            OpType::Prog2 | OpType::IfFoodAhead => 2,
            OpType::MoveForward | OpType::TurnLeft | OpType::TurnRight => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.arity() == 0
    }

    pub fn is_nonterminal(self) -> bool {
        !self.is_terminal()
    }

    /// Single character used for terminals in the tree's text form.
    pub fn symbol(self) -> Option<char> {
        match self {
            OpType::MoveForward => Some('M'),
            OpType::TurnLeft => Some('L'),
            OpType::TurnRight => Some('R'),
            _ => None,
        }
    }

    /// Inverse of [`OpType::symbol`].
    pub fn from_symbol(c: char) -> Option<OpType> {
        match c {
            'M' => Some(OpType::MoveForward),
            'L' => Some(OpType::TurnLeft),
            'R' => Some(OpType::TurnRight),
            _ => None,
        }
    }

    /// Human readable label, used for GraphViz node labels.
    pub fn label(self) -> &'static str {
        match self {
            OpType::Prog3 => "prog3",
            OpType::Prog2 => "prog2",
            OpType::IfFoodAhead => "if_food_ahead",
            OpType::MoveForward => "move",
            OpType::TurnLeft => "left",
            OpType::TurnRight => "right",
        }
    }
}
