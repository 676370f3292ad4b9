//! Game status state machine.
//!
//! `menu -> playing <-> paused`, `playing|paused -> gameMenu -> previous`,
//! `playing -> gameOver|won`, and restart/menu exits from everywhere else.
//! Session resets are the engine's job; this only tracks the status.

use citadel_core::enums::GameStatus;
use citadel_core::error::ActionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusMachine {
    status: GameStatus,
    /// Status to restore when the in-game menu closes.
    before_menu: Option<GameStatus>,
}

fn refuse(action: &'static str, status: GameStatus) -> ActionError {
    ActionError::InvalidTransition { action, status }
}

impl StatusMachine {
    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Menu -> playing.
    pub fn start(&mut self) -> Result<(), ActionError> {
        if self.status != GameStatus::Menu {
            return Err(refuse("start a game", self.status));
        }
        self.enter(GameStatus::Playing);
        Ok(())
    }

    /// Any in-session status -> playing.
    pub fn restart(&mut self) -> Result<(), ActionError> {
        if self.status == GameStatus::Menu {
            return Err(refuse("restart", self.status));
        }
        self.enter(GameStatus::Playing);
        Ok(())
    }

    pub fn return_to_menu(&mut self) -> Result<(), ActionError> {
        if self.status == GameStatus::Menu {
            return Err(refuse("return to the menu", self.status));
        }
        self.enter(GameStatus::Menu);
        Ok(())
    }

    /// Playing <-> paused. Returns the new status.
    pub fn toggle_pause(&mut self) -> Result<GameStatus, ActionError> {
        match self.status {
            GameStatus::Playing => self.pause().map(|_| GameStatus::Paused),
            GameStatus::Paused => self.resume().map(|_| GameStatus::Playing),
            other => Err(refuse("toggle pause", other)),
        }
    }

    pub fn pause(&mut self) -> Result<(), ActionError> {
        if self.status != GameStatus::Playing {
            return Err(refuse("pause", self.status));
        }
        self.status = GameStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ActionError> {
        if self.status != GameStatus::Paused {
            return Err(refuse("resume", self.status));
        }
        self.status = GameStatus::Playing;
        Ok(())
    }

    pub fn open_game_menu(&mut self) -> Result<(), ActionError> {
        if !matches!(self.status, GameStatus::Playing | GameStatus::Paused) {
            return Err(refuse("open the game menu", self.status));
        }
        self.before_menu = Some(self.status);
        self.status = GameStatus::GameMenu;
        Ok(())
    }

    pub fn close_game_menu(&mut self) -> Result<GameStatus, ActionError> {
        if self.status != GameStatus::GameMenu {
            return Err(refuse("close the game menu", self.status));
        }
        self.status = self.before_menu.take().unwrap_or(GameStatus::Playing);
        Ok(self.status)
    }

    /// Playing -> gameOver.
    pub fn lose(&mut self) -> Result<(), ActionError> {
        if self.status != GameStatus::Playing {
            return Err(refuse("end the game", self.status));
        }
        self.enter(GameStatus::GameOver);
        Ok(())
    }

    /// Playing -> won.
    pub fn win(&mut self) -> Result<(), ActionError> {
        if self.status != GameStatus::Playing {
            return Err(refuse("win", self.status));
        }
        self.enter(GameStatus::Won);
        Ok(())
    }

    fn enter(&mut self, status: GameStatus) {
        self.status = status;
        self.before_menu = None;
    }
}
